use console::{style, StyledObject};

fn styled(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string())
}

/// Healthy values and all-clear messages.
pub fn good(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).bright().green()
}

/// Failing values and problem counts.
pub fn bad(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).bright().red()
}

/// Counts and names the reader should look at.
pub fn attention(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).bright().yellow()
}

/// Inline labels and list bullets.
pub fn accent(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).cyan()
}

/// Secondary detail next to a primary value.
pub fn muted(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).dim()
}

/// Section headers.
pub fn heading(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).bright()
}

/// The program banner.
pub fn banner_text(text: impl std::fmt::Display) -> StyledObject<String> {
    styled(text).magenta().bold()
}
