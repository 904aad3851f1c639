use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};

/// Blocking yes/no question put to the user.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Asks on stdout and reads the answer from stdin. Anything but y/yes is no.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// For `--yes`.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Fire-and-forget clipboard write. Failures are not reported.
pub trait Clipboard {
    fn write(&self, text: &str);
}

/// Pipes text into the first platform clipboard tool that accepts it.
pub struct SystemClipboard;

const CLIPBOARD_COMMANDS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("clip.exe", &[]),
];

impl Clipboard for SystemClipboard {
    fn write(&self, text: &str) {
        for (program, args) in CLIPBOARD_COMMANDS {
            match pipe_to(program, args, text) {
                Ok(()) => {
                    tracing::debug!(program, "copied to clipboard");
                    return;
                }
                Err(err) => tracing::trace!(program, error = %err, "clipboard tool unavailable"),
            }
        }
        tracing::debug!("no clipboard tool accepted the text");
    }
}

fn pipe_to(program: &str, args: &[&str], text: &str) -> io::Result<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes())?;
    }
    let status = child.wait()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("{} exited with {}", program, status)))
    }
}
