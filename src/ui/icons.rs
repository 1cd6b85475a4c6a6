pub struct Icons;

impl Icons {
    pub const ROCKET: &'static str = "🚀";
    pub const CHECK: &'static str = "✅";
    pub const CROSS: &'static str = "❌";
    pub const WARN: &'static str = "⚠️";
    pub const INFO: &'static str = "ℹ️";
    pub const STATS: &'static str = "📊";
    pub const FILE: &'static str = "📄";
    pub const SEARCH: &'static str = "🔍";
    pub const EMPTY: &'static str = "∅";
}
