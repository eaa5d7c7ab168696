#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Backend,
    Groq,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Backend => "backend",
            Provider::Groq => "groq",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "backend" => Some(Provider::Backend),
            "groq" => Some(Provider::Groq),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Backend => "Chat backend",
            Provider::Groq => "Groq (direct)",
        }
    }
}
