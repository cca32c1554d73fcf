//! Kind-to-style resolution.
//!
//! The resolver is injected per document at install time. [`StyleTable`] is the
//! stock implementation; any `Fn(SemanticKind) -> Style` works as well.

use shade_primitives::{Color, Modifier, SemanticKind, Style};

/// Total mapping from semantic kind to a renderable style.
pub trait StyleResolver: Send + Sync {
	fn resolve(&self, kind: SemanticKind) -> Style;
}

impl<F> StyleResolver for F
where
	F: Fn(SemanticKind) -> Style + Send + Sync,
{
	fn resolve(&self, kind: SemanticKind) -> Style {
		self(kind)
	}
}

const STRING: Color = Color::Rgb(0x2a, 0x00, 0xff);
const VARIABLE: Color = Color::Rgb(0x6a, 0x3e, 0x3e);
const FIELD: Color = Color::Rgb(0x00, 0x00, 0xc0);
const NUMBER: Color = Color::Rgb(0x7d, 0x4e, 0x00);
const TAG_KEY: Color = Color::Rgb(0x64, 0x64, 0x64);
const METHOD: Color = Color::Rgb(0x00, 0x55, 0x80);
const DYNAMIC: Color = Color::Rgb(0x66, 0x00, 0x99);

/// Dense style table indexed by [`SemanticKind`].
///
/// Several kinds share a style by default (declarations of methods, static
/// methods and constructors; instance and constructor calls; locals and
/// parameters), so switching between them is not a visible change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTable {
	styles: [Style; SemanticKind::ALL.len()],
}

impl Default for StyleTable {
	fn default() -> Self {
		let mut table = Self {
			styles: [Style::PLAIN; SemanticKind::ALL.len()],
		};
		for kind in SemanticKind::ALL {
			table.set(kind, Self::default_style(kind));
		}
		table
	}
}

impl StyleTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Built-in style for `kind` before any configuration is applied.
	pub fn default_style(kind: SemanticKind) -> Style {
		use SemanticKind::*;
		let fixed = Self::fixed_modifiers(kind);
		let base = match kind {
			MapKey | Regexp => Style::from(STRING),
			TagKey => Style::from(TAG_KEY),
			Number => Style::from(NUMBER),
			UndefinedRef => Style::PLAIN,
			DeprecatedRef => Style::from(Modifier::CROSSED_OUT),
			LocalVar | Parameter => Style::from(VARIABLE),
			Field => Style::from(FIELD),
			StaticField => Style::from(FIELD).add_modifier(Modifier::ITALIC),
			StaticValue => Style::from(FIELD).add_modifier(Modifier::BOLD | Modifier::ITALIC),
			MethodDecl | StaticMethodDecl | CtorDecl => Style::from(Modifier::BOLD),
			MethodCall | CtorCall => Style::from(METHOD),
			DynamicCall => Style::from(DYNAMIC),
			StaticCall => Style::from(METHOD).add_modifier(Modifier::ITALIC),
		};
		base.add_modifier(fixed)
	}

	/// Modifiers a kind always carries, even when its preference is disabled.
	pub const fn fixed_modifiers(kind: SemanticKind) -> Modifier {
		match kind {
			SemanticKind::Regexp => Modifier::ITALIC,
			SemanticKind::UndefinedRef => Modifier::UNDERLINED,
			_ => Modifier::empty(),
		}
	}

	pub fn get(&self, kind: SemanticKind) -> Style {
		self.styles[kind as usize]
	}

	pub fn set(&mut self, kind: SemanticKind, style: Style) {
		self.styles[kind as usize] = style;
	}

	pub fn with(mut self, kind: SemanticKind, style: Style) -> Self {
		self.set(kind, style);
		self
	}
}

impl StyleResolver for StyleTable {
	fn resolve(&self, kind: SemanticKind) -> Style {
		self.get(kind)
	}
}
