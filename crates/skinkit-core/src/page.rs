/// Server-provided facts about the page being enhanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContext {
    pub namespace: i32,
    pub action: String,
}

impl Default for PageContext {
    fn default() -> Self {
        Self {
            namespace: 0,
            action: "view".to_string(),
        }
    }
}

/// Capabilities of the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    /// Intersection observation is available. Without it the sticky header
    /// and every scroll-driven behavior stay inert.
    pub intersection_observer: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            intersection_observer: true,
        }
    }
}
