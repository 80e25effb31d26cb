// src/console/status.rs

//! Closed sets of status icons and terminal colours.

/// Semantic status shown as an icon in front of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    None,
    Success,
    Fatal,
    Error,
    Warning,
    Info,
    Debug,
    Build,
    Install,
    Idea,
    Settings,
    Security,
    Execute,
    Search,
    Target,
    Comment,
    File,
    Folder,
    Trash,
    Link,
    Mail,
    Attachment,
    Edit,
    Pin,
    Lock,
    Rocket,
    Fire,
    Lightning,
    Bug,
}

impl Status {
    /// Emoji for this status; empty for [`Status::None`].
    pub fn icon(self) -> &'static str {
        match self {
            Status::None => "",
            Status::Success => "✅",
            Status::Fatal => "⛔",
            Status::Error => "❌",
            Status::Warning => "⚠️",
            Status::Info => "ℹ️",
            Status::Debug => "🚸",
            Status::Build => "🔨",
            Status::Install => "📦",
            Status::Idea => "💡",
            Status::Settings => "⚙️",
            Status::Security => "🔑",
            Status::Execute => "🚦",
            Status::Search => "🔍",
            Status::Target => "🎯",
            Status::Comment => "💬",
            Status::File => "📄",
            Status::Folder => "📁",
            Status::Trash => "🗑️",
            Status::Link => "🔗",
            Status::Mail => "✉️",
            Status::Attachment => "📎",
            Status::Edit => "✏️",
            Status::Pin => "📌",
            Status::Lock => "🔒",
            Status::Rocket => "🚀",
            Status::Fire => "🔥",
            Status::Lightning => "⚡",
            Status::Bug => "🐛",
        }
    }
}

/// Terminal colour for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    None,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Purple,
    White,
    Cyan,
}

impl Color {
    pub(crate) fn to_console(self) -> Option<console::Color> {
        match self {
            Color::None => None,
            Color::Black => Some(console::Color::Black),
            Color::Red => Some(console::Color::Red),
            Color::Green => Some(console::Color::Green),
            Color::Yellow => Some(console::Color::Yellow),
            Color::Blue => Some(console::Color::Blue),
            Color::Purple => Some(console::Color::Magenta),
            Color::White => Some(console::Color::White),
            Color::Cyan => Some(console::Color::Cyan),
        }
    }
}
