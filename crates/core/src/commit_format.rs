//! Commit message formatting and version recovery.
//!
//! The default subject `Version <version>: <folder> (created: <date>)` is also
//! what append runs parse to learn which versions already exist, so both the
//! formatter and [`CommitFormatter::extract_version`] live here.

/// Subject prefix of the default message.
pub const VERSION_PREFIX: &str = "Version ";

/// Trailer key appended to templated messages when requested.
pub const VERSION_TRAILER: &str = "Source-Version:";

/// Values available to a message template.
#[derive(Debug, Clone)]
pub struct MessageContext<'a> {
    pub version: &'a str,
    pub folder: &'a str,
    pub date: &'a str,
    pub files: usize,
    pub author: &'a str,
}

/// Formats commit messages from an optional template.
#[derive(Debug, Clone, Default)]
pub struct CommitFormatter {
    template: Option<String>,
    trailer: bool,
}

impl CommitFormatter {
    /// `template` placeholders: `{version}`, `{folder}`, `{date}`, `{files}`,
    /// `{author}`. With `trailer`, templated messages get a
    /// `Source-Version:` line.
    pub fn new(template: Option<&str>, trailer: bool) -> Self {
        Self {
            template: template.filter(|t| !t.is_empty()).map(str::to_string),
            trailer,
        }
    }

    /// Whether messages from this formatter can be read back by
    /// [`extract_version`](Self::extract_version).
    pub fn is_scannable(&self) -> bool {
        self.template.is_none() || self.trailer
    }

    pub fn format(&self, ctx: &MessageContext<'_>) -> String {
        match self.template {
            Some(ref template) => {
                let message = template
                    .replace("{version}", ctx.version)
                    .replace("{folder}", ctx.folder)
                    .replace("{date}", ctx.date)
                    .replace("{files}", &ctx.files.to_string())
                    .replace("{author}", ctx.author);
                if self.trailer {
                    format!("{}\n\n{} {}", message.trim_end(), VERSION_TRAILER, ctx.version)
                } else {
                    message
                }
            }
            None => Self::default_message(ctx.version, ctx.folder, ctx.date),
        }
    }

    /// `Version <version>: <folder> (created: <date>)`
    pub fn default_message(version: &str, folder: &str, date: &str) -> String {
        format!("{}{}: {} (created: {})", VERSION_PREFIX, version, folder, date)
    }

    /// Recover the version token from a commit message.
    ///
    /// Looks for a `Source-Version:` trailer first, then for a subject line
    /// starting with `Version <token>:`.
    pub fn extract_version(message: &str) -> Option<String> {
        for line in message.lines() {
            if let Some(rest) = line.trim().strip_prefix(VERSION_TRAILER) {
                let version = rest.trim();
                if !version.is_empty() {
                    return Some(version.to_string());
                }
            }
        }

        let subject = message.lines().next()?;
        let rest = subject.strip_prefix(VERSION_PREFIX)?;
        let end = rest.find(':')?;
        let version = rest[..end].trim();
        if version.is_empty() {
            None
        } else {
            Some(version.to_string())
        }
    }
}
