use bitflags::bitflags;


/// Foreground color of a rendered annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
	Black,
	Red,
	Green,
	Yellow,
	Blue,
	Magenta,
	Cyan,
	Gray,
	DarkGray,
	LightRed,
	LightGreen,
	LightYellow,
	LightBlue,
	LightMagenta,
	LightCyan,
	White,
	/// 24-bit color.
	Rgb(u8, u8, u8),
}

bitflags! {
	/// Font-style flags applied on top of the color.
	#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
	pub struct Modifier: u8 {
		/// Bold text.
		const BOLD        = 0b0001;
		/// Italic text.
		const ITALIC      = 0b0010;
		/// Underlined text.
		const UNDERLINED  = 0b0100;
		/// Crossed out text.
		const CROSSED_OUT = 0b1000;
	}
}

/// Renderable style token for an annotation.
///
/// Equality is the authoritative match key when comparing published
/// highlights: two kinds that resolve to equal styles look identical.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Style {
	/// `None` leaves the surface's contextual color in place.
	pub fg: Option<Color>,
	pub modifiers: Modifier,
}

impl Style {
	/// Style with no color and no modifiers.
	pub const PLAIN: Style = Style {
		fg: None,
		modifiers: Modifier::empty(),
	};

	pub const fn new() -> Self {
		Self::PLAIN
	}

	pub const fn fg(mut self, color: Color) -> Self {
		self.fg = Some(color);
		self
	}

	pub const fn add_modifier(mut self, modifier: Modifier) -> Self {
		self.modifiers = self.modifiers.union(modifier);
		self
	}

	/// Returns true when the style changes nothing about the text.
	pub const fn is_plain(&self) -> bool {
		self.fg.is_none() && self.modifiers.is_empty()
	}
}

impl From<Color> for Style {
	fn from(color: Color) -> Self {
		Style::new().fg(color)
	}
}

impl From<Modifier> for Style {
	fn from(modifiers: Modifier) -> Self {
		Style { fg: None, modifiers }
	}
}
