use std::path::Path;

/// Host flavour that decides how bind-mount sources are spelled for the engine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HostOs {
    MacOs,
    Windows,
    /// Linux running under WSL2 (`WSL_INTEROP` is set).
    Wsl,
    /// Any other Unix; paths are passed through.
    Linux,
}

impl HostOs {
    /// Detect the flavour of the running process.
    pub fn detect() -> Self {
        Self::from_parts(
            std::env::consts::OS,
            std::env::var_os("WSL_INTEROP").is_some(),
        )
    }

    /// Resolve the flavour from an OS name (as in `std::env::consts::OS`)
    /// and whether the WSL interop marker is present.
    pub fn from_parts(os: &str, wsl_interop: bool) -> Self {
        match os {
            "macos" => HostOs::MacOs,
            "windows" => HostOs::Windows,
            "linux" if wsl_interop => HostOs::Wsl,
            _ => HostOs::Linux,
        }
    }
}

/// Rewrite a host path into the form the engine expects as a bind source.
///
/// - Windows: `/mnt/c/Users/x` becomes `C:\Users\x`.
/// - WSL2: `C:\Users\x` becomes `/mnt/c/Users/x`.
/// - macOS / Linux: unchanged.
pub fn mount_source(path: &Path, os: HostOs) -> String {
    let raw = path.to_string_lossy();
    match os {
        HostOs::Windows => windows_from_wsl(&raw).unwrap_or_else(|| raw.into_owned()),
        HostOs::Wsl => wsl_from_windows(&raw).unwrap_or_else(|| raw.into_owned()),
        HostOs::MacOs | HostOs::Linux => raw.into_owned(),
    }
}

fn windows_from_wsl(path: &str) -> Option<String> {
    let rest = path.strip_prefix("/mnt/")?;
    let mut chars = rest.chars();
    let drive = chars.next()?;
    let tail = chars.as_str().replace('/', "\\");
    Some(format!("{}:{tail}", drive.to_ascii_uppercase()))
}

fn wsl_from_windows(path: &str) -> Option<String> {
    let mut chars = path.chars();
    let drive = chars.next()?;
    if chars.next()? != ':' {
        return None;
    }
    let tail = chars.as_str().replace('\\', "/");
    Some(format!("/mnt/{}{tail}", drive.to_ascii_lowercase()))
}
