//! TOML style preferences and classifier precedence.
//!
//! ```toml
//! [styles.local_var]
//! fg = "#6a3e3e"
//! bold = true
//!
//! [styles.regexp]
//! enabled = false
//!
//! [precedence]
//! order = ["unresolved", "deprecated"]
//! ```
//!
//! Every key is optional. Unmentioned kinds keep [`StyleTable::default_style`]
//! and unmentioned rules keep their default relative order after the listed
//! ones.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shade_primitives::{Color, Modifier, SemanticKind, Style};
use thiserror::Error;

use crate::{ClassifierPolicy, ClassifyRule, StyleTable};


/// Errors from loading or validating a style configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("invalid color format: {0}")]
	InvalidColor(String),

	/// A `[styles.<kind>]` table named no known kind.
	#[error("unknown annotation kind: {0}")]
	UnknownKind(String),

	#[error("unknown precedence rule: {0}")]
	UnknownRule(String),

	#[error("precedence rule listed twice: {0}")]
	DuplicateRule(ClassifyRule),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Per-kind preference overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindStyleConfig {
	/// `false` strips the color and configurable modifiers.
	pub enabled: Option<bool>,
	/// Hex (`#RGB`, `#RRGGBB`), a named color, or `"default"` for no color.
	pub fg: Option<String>,
	pub bold: Option<bool>,
	pub italic: Option<bool>,
	pub underline: Option<bool>,
	pub strikethrough: Option<bool>,
}

impl KindStyleConfig {
	fn apply(&self, kind: SemanticKind) -> Result<Style> {
		let fixed = StyleTable::fixed_modifiers(kind);
		if self.enabled == Some(false) {
			return Ok(Style::from(fixed));
		}

		let mut style = StyleTable::default_style(kind);
		if let Some(fg) = &self.fg {
			style.fg = parse_color(fg)?;
		}
		for (toggle, flag) in [
			(self.bold, Modifier::BOLD),
			(self.italic, Modifier::ITALIC),
			(self.underline, Modifier::UNDERLINED),
			(self.strikethrough, Modifier::CROSSED_OUT),
		] {
			if let Some(on) = toggle {
				style.modifiers.set(flag, on);
			}
		}
		style.modifiers |= fixed;
		Ok(style)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrecedenceConfig {
	/// Rule names, highest precedence first.
	#[serde(default)]
	pub order: Vec<String>,
}

/// Raw deserialized configuration; validated by [`Self::into_parts`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleConfig {
	#[serde(default)]
	pub styles: BTreeMap<String, KindStyleConfig>,
	pub precedence: Option<PrecedenceConfig>,
}

impl StyleConfig {
	pub fn from_toml(source: &str) -> Result<Self> {
		Ok(toml::from_str(source)?)
	}

	pub fn load(path: &Path) -> Result<Self> {
		let source = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		let config = Self::from_toml(&source)?;
		tracing::debug!(path = %path.display(), kinds = config.styles.len(), "highlight.config.loaded");
		Ok(config)
	}

	/// Builds the style table with every override applied on top of the defaults.
	pub fn style_table(&self) -> Result<StyleTable> {
		let mut table = StyleTable::default();
		for (name, prefs) in &self.styles {
			let kind = name
				.parse::<SemanticKind>()
				.map_err(|_| ConfigError::UnknownKind(name.clone()))?;
			table.set(kind, prefs.apply(kind)?);
		}
		Ok(table)
	}

	/// Builds the classifier policy from `[precedence]`.
	pub fn policy(&self) -> Result<ClassifierPolicy> {
		let Some(precedence) = &self.precedence else {
			return Ok(ClassifierPolicy::default());
		};
		let mut rules = Vec::with_capacity(precedence.order.len());
		for name in &precedence.order {
			let rule = name.parse::<ClassifyRule>().map_err(ConfigError::UnknownRule)?;
			if rules.contains(&rule) {
				return Err(ConfigError::DuplicateRule(rule));
			}
			rules.push(rule);
		}
		Ok(ClassifierPolicy::from_order(rules))
	}

	pub fn into_parts(self) -> Result<(StyleTable, ClassifierPolicy)> {
		Ok((self.style_table()?, self.policy()?))
	}
}

/// Parses a color value. `"default"`, `"reset"` and `"none"` mean no color.
pub fn parse_color(value: &str) -> Result<Option<Color>> {
	let value = value.trim();
	if ["default", "reset", "none"].iter().any(|v| value.eq_ignore_ascii_case(v)) {
		return Ok(None);
	}
	if let Some(hex) = value.strip_prefix('#') {
		return parse_hex_color(hex).map(Some);
	}
	parse_named_color(value).map(Some)
}

fn parse_hex_color(hex: &str) -> Result<Color> {
	let err = || ConfigError::InvalidColor(format!("#{hex}"));
	if !hex.is_ascii() {
		return Err(err());
	}

	match hex.len() {
		3 => {
			let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).map_err(|_| err())?;
			let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).map_err(|_| err())?;
			let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).map_err(|_| err())?;
			Ok(Color::Rgb(r, g, b))
		}
		6 => {
			let r = u8::from_str_radix(&hex[0..2], 16).map_err(|_| err())?;
			let g = u8::from_str_radix(&hex[2..4], 16).map_err(|_| err())?;
			let b = u8::from_str_radix(&hex[4..6], 16).map_err(|_| err())?;
			Ok(Color::Rgb(r, g, b))
		}
		_ => Err(err()),
	}
}

fn parse_named_color(name: &str) -> Result<Color> {
	let normalized = name.to_lowercase().replace(['-', '_'], "");

	match normalized.as_str() {
		"black" => Ok(Color::Black),
		"red" => Ok(Color::Red),
		"green" => Ok(Color::Green),
		"yellow" => Ok(Color::Yellow),
		"blue" => Ok(Color::Blue),
		"magenta" => Ok(Color::Magenta),
		"cyan" => Ok(Color::Cyan),
		"gray" | "grey" => Ok(Color::Gray),
		"darkgray" | "darkgrey" => Ok(Color::DarkGray),
		"lightred" => Ok(Color::LightRed),
		"lightgreen" => Ok(Color::LightGreen),
		"lightyellow" => Ok(Color::LightYellow),
		"lightblue" => Ok(Color::LightBlue),
		"lightmagenta" => Ok(Color::LightMagenta),
		"lightcyan" => Ok(Color::LightCyan),
		"white" => Ok(Color::White),
		_ => Err(ConfigError::InvalidColor(name.to_string())),
	}
}
