/// Where a unit of highlight work runs; recorded on every spawn event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Classification and diffing on the blocking pool.
	CpuBlocking,
	/// Long-lived named threads, such as the render loop.
	Dedicated,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::CpuBlocking => "cpu_blocking",
			Self::Dedicated => "dedicated",
		}
	}
}
