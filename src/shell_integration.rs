// OS-level actions on the open file.
//
// - `clipboard_copy_text`: puts the file's path on the clipboard as plain
//   text (clipboard-win on Windows, pbcopy on macOS, xclip on Linux).
// - `reveal_in_file_manager`: opens Explorer, Finder or the desktop file
//   manager with the file selected (or its folder open, on Linux).
//
// Both return `anyhow::Result`; callers log failures rather than surfacing
// them in the viewer.

use std::path::Path;

/// Path text as the user would type it, without the `\\?\` verbatim prefix
/// that `canonicalize` adds on Windows.
pub fn display_path(path: &Path) -> String {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix(r"\\?\UNC\") {
        format!(r"\\{}", rest)
    } else if let Some(rest) = text.strip_prefix(r"\\?\") {
        rest.to_string()
    } else {
        text.into_owned()
    }
}

#[cfg(target_os = "windows")]
pub fn clipboard_copy_text(text: &str) -> anyhow::Result<()> {
    clipboard_win::set_clipboard_string(text)
        .map_err(|e| anyhow::anyhow!("Failed to set clipboard text: {}", e))
}

#[cfg(target_os = "macos")]
pub fn clipboard_copy_text(text: &str) -> anyhow::Result<()> {
    pipe_to_command("pbcopy", &[], text)
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub fn clipboard_copy_text(text: &str) -> anyhow::Result<()> {
    pipe_to_command("xclip", &["-selection", "clipboard"], text).map_err(|err| {
        anyhow::anyhow!("{err}. Install xclip with: sudo apt install xclip")
    })
}

#[cfg(not(target_os = "windows"))]
fn pipe_to_command(program: &str, args: &[&str], input: &str) -> anyhow::Result<()> {
    use std::io::Write;

    let mut child = std::process::Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::piped())
        .spawn()
        .map_err(|e| anyhow::anyhow!("{program} could not be started: {e}"))?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes())?;
    }
    let status = child.wait()?;
    if !status.success() {
        anyhow::bail!("{program} exited with status {status}");
    }
    Ok(())
}

/// Open the native file manager with the specified file selected.
///
/// Windows runs `explorer /select,<path>`, macOS `open -R <path>`, and Linux
/// `xdg-open <parent-dir>` since most Linux file managers can't select a file.
pub fn reveal_in_file_manager(path: &Path) -> anyhow::Result<()> {
    let abs_path = path.canonicalize()?;

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("explorer")
            .arg(format!("/select,{}", display_path(&abs_path)))
            .spawn()?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg("-R")
            .arg(&abs_path)
            .spawn()?;
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let parent = abs_path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine parent directory"))?;
        std::process::Command::new("xdg-open").arg(parent).spawn()?;
    }

    Ok(())
}
