//! Host-supplied settings threaded explicitly through the crate.
//!
//! `CoreConfig` is read from TOML. Every field is optional; partial piece maps
//! are completed from the defaults, so a file only needs the entries it wants
//! to change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chess_errors::ChessErrors;
use crate::game_state::chess_types::{Color, Piece, PieceKind};
use crate::game_state::position::DEFAULT_SITE;

pub const DEFAULT_ENGINE_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub default_site: String,
    pub engine_command: Option<PathBuf>,
    pub engine_args: Vec<String>,
    pub engine_default_timeout_ms: u64,
    /// Human-readable name per piece kind, keyed by `king`, `queen`, ...
    pub piece_display_names: BTreeMap<String, String>,
    /// Board-surface token per colour and piece kind.
    pub piece_materials: PieceMaterials,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PieceMaterials {
    pub white: BTreeMap<String, String>,
    pub black: BTreeMap<String, String>,
}

impl PieceMaterials {
    fn for_color(&self, color: Color) -> &BTreeMap<String, String> {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        let piece_display_names = PieceKind::ALL
            .iter()
            .map(|kind| (kind_key(*kind).to_owned(), default_display_name(*kind).to_owned()))
            .collect();
        let tokens = |color: Color| {
            PieceKind::ALL
                .iter()
                .map(|kind| (kind_key(*kind).to_owned(), default_token(Piece::new(color, *kind))))
                .collect()
        };

        Self {
            default_site: DEFAULT_SITE.to_owned(),
            engine_command: None,
            engine_args: Vec::new(),
            engine_default_timeout_ms: DEFAULT_ENGINE_TIMEOUT_MS,
            piece_display_names,
            piece_materials: PieceMaterials {
                white: tokens(Color::White),
                black: tokens(Color::Black),
            },
        }
    }
}

impl CoreConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ChessErrors> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text).map_err(|err| match err {
            ChessErrors::Config(message) => {
                ChessErrors::Config(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ChessErrors> {
        let mut config: CoreConfig =
            toml::from_str(text).map_err(|err| ChessErrors::Config(err.to_string()))?;
        config.complete()?;
        Ok(config)
    }

    /// Rejects unknown piece keys and duplicate tokens, then fills in the
    /// entries the file left out.
    fn complete(&mut self) -> Result<(), ChessErrors> {
        let defaults = CoreConfig::default();

        for map in [
            &self.piece_display_names,
            &self.piece_materials.white,
            &self.piece_materials.black,
        ] {
            if let Some(key) = map.keys().find(|key| kind_from_key(key).is_none()) {
                return Err(ChessErrors::Config(format!("unknown piece kind '{key}'")));
            }
        }

        for (key, value) in defaults.piece_display_names {
            self.piece_display_names.entry(key).or_insert(value);
        }
        for (key, value) in defaults.piece_materials.white {
            self.piece_materials.white.entry(key).or_insert(value);
        }
        for (key, value) in defaults.piece_materials.black {
            self.piece_materials.black.entry(key).or_insert(value);
        }

        let mut seen = BTreeMap::new();
        for color in Color::ALL {
            for (key, token) in self.piece_materials.for_color(color) {
                if let Some(previous) = seen.insert(token.as_str(), (color, key.as_str())) {
                    return Err(ChessErrors::Config(format!(
                        "token '{token}' used for both {previous:?} and ({color:?}, {key})"
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn display_name(&self, kind: PieceKind) -> &str {
        self.piece_display_names
            .get(kind_key(kind))
            .map_or_else(|| default_display_name(kind), String::as_str)
    }

    pub fn token_for(&self, piece: Piece) -> String {
        self.piece_materials
            .for_color(piece.color)
            .get(kind_key(piece.kind))
            .cloned()
            .unwrap_or_else(|| default_token(piece))
    }

    /// Reverse lookup of [`CoreConfig::token_for`]; unknown tokens give `None`.
    pub fn piece_for_token(&self, token: &str) -> Option<Piece> {
        Color::ALL.iter().find_map(|color| {
            PieceKind::ALL
                .iter()
                .find(|kind| self.token_for(Piece::new(*color, **kind)) == token)
                .map(|kind| Piece::new(*color, *kind))
        })
    }

    pub fn engine_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.engine_default_timeout_ms)
    }
}

/// Lowercase key used for a piece kind in config maps.
pub const fn kind_key(kind: PieceKind) -> &'static str {
    match kind {
        PieceKind::King => "king",
        PieceKind::Queen => "queen",
        PieceKind::Rook => "rook",
        PieceKind::Bishop => "bishop",
        PieceKind::Knight => "knight",
        PieceKind::Pawn => "pawn",
    }
}

fn kind_from_key(key: &str) -> Option<PieceKind> {
    PieceKind::ALL.iter().copied().find(|kind| kind_key(*kind) == key)
}

const fn default_display_name(kind: PieceKind) -> &'static str {
    match kind {
        PieceKind::King => "King",
        PieceKind::Queen => "Queen",
        PieceKind::Rook => "Rook",
        PieceKind::Bishop => "Bishop",
        PieceKind::Knight => "Knight",
        PieceKind::Pawn => "Pawn",
    }
}

fn default_token(piece: Piece) -> String {
    let color = match piece.color {
        Color::White => "white",
        Color::Black => "black",
    };
    format!("{color}_{}", kind_key(piece.kind))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::CoreConfig;
    use crate::chess_errors::ChessErrors;
    use crate::game_state::chess_types::{Color, Piece, PieceKind};

    #[test]
    fn defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.default_site, "Local");
        assert_eq!(config.engine_default_timeout_ms, 60_000);
        assert_eq!(config.engine_command, None);
        assert_eq!(config.display_name(PieceKind::Knight), "Knight");
        assert_eq!(
            config.token_for(Piece::new(Color::Black, PieceKind::Queen)),
            "black_queen"
        );
    }

    #[test]
    fn empty_text_is_the_default_config() {
        let config = CoreConfig::from_toml_str("").expect("empty TOML should parse");
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn partial_maps_are_completed() {
        let config = CoreConfig::from_toml_str(
            r#"
            default_site = "Castle Hall"
            engine_command = "/usr/bin/stockfish"
            engine_args = ["--threads", "2"]

            [piece_display_names]
            knight = "Springer"

            [piece_materials.white]
            king = "gold_block"
            "#,
        )
        .expect("TOML should parse");

        assert_eq!(config.default_site, "Castle Hall");
        assert_eq!(config.engine_args, vec!["--threads".to_owned(), "2".to_owned()]);
        assert_eq!(config.display_name(PieceKind::Knight), "Springer");
        assert_eq!(config.display_name(PieceKind::Rook), "Rook");

        let white_king = Piece::new(Color::White, PieceKind::King);
        assert_eq!(config.token_for(white_king), "gold_block");
        assert_eq!(config.piece_for_token("gold_block"), Some(white_king));
        assert_eq!(
            config.piece_for_token("black_pawn"),
            Some(Piece::new(Color::Black, PieceKind::Pawn))
        );
        assert_eq!(config.piece_for_token("white_king"), None);
        assert_eq!(config.piece_for_token("dirt"), None);
    }

    #[test]
    fn bad_configs_are_rejected() {
        for text in [
            "engine_default_timeout_ms = \"soon\"",
            "unknown_field = 1",
            "[piece_display_names]\ndragon = \"Dragon\"",
            "[piece_materials.black]\nking = \"white_king\"",
        ] {
            assert!(
                matches!(CoreConfig::from_toml_str(text), Err(ChessErrors::Config(_))),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file should be created");
        writeln!(file, "engine_default_timeout_ms = 1500").expect("temp file should be writable");

        let config = CoreConfig::load(file.path()).expect("config file should load");
        assert_eq!(config.engine_default_timeout_ms, 1500);
        assert_eq!(config.engine_timeout().as_millis(), 1500);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let missing = dir.path().join("absent.toml");
        assert!(matches!(CoreConfig::load(missing), Err(ChessErrors::Io(_))));
    }
}
