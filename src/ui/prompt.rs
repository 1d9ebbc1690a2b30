//! Interactive prompts for the clip flow

use crate::types::{DownloadRequest, MediaFormat, VideoDescriptor};
use crate::utils::time::{format_duration, parse_timestamp};
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};

/// Ask for the video URL
pub fn ask_url() -> dialoguer::Result<String> {
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Video URL")
        .interact_text()
}

/// Ask whether to install missing tools now
pub fn confirm_install(missing: &str) -> dialoguer::Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Missing {}. Install now?", missing))
        .default(true)
        .interact()
}

/// Fill trim points and format from the user, starting from `request`
pub fn ask_clip_options(
    request: &mut DownloadRequest,
    video: &VideoDescriptor,
) -> dialoguer::Result<()> {
    let theme = ColorfulTheme::default();
    let length = video.duration_seconds;

    let start = ask_timestamp(&theme, "Start (blank = beginning)", length, request.start_time.clone())?;
    let end = ask_timestamp(
        &theme,
        &format!("End (blank = {})", format_duration(length)),
        length,
        request.end_time.clone(),
    )?;
    request.start_time = start;
    request.end_time = end;

    let formats = [MediaFormat::Video, MediaFormat::Audio];
    let current = formats.iter().position(|f| *f == request.format).unwrap_or(0);
    let choice = Select::with_theme(&theme)
        .with_prompt("Format")
        .items(&formats)
        .default(current)
        .interact()?;
    request.format = formats[choice];

    Ok(())
}

fn ask_timestamp(
    theme: &ColorfulTheme,
    prompt: &str,
    length: u64,
    initial: Option<String>,
) -> dialoguer::Result<Option<String>> {
    let answer: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .with_initial_text(initial.unwrap_or_default())
        .allow_empty(true)
        .validate_with(|input: &String| -> Result<(), String> {
            if input.trim().is_empty() {
                return Ok(());
            }
            match parse_timestamp(input) {
                None => Err("Use h:mm:ss, mm:ss or ss".into()),
                Some(secs) if length > 0 && secs > length => {
                    Err(format!("Video is only {} long", format_duration(length)))
                }
                Some(_) => Ok(()),
            }
        })
        .interact_text()?;

    let answer = answer.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}
