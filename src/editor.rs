//! Editor-launch contract.
//!
//! The engine never talks to an editor directly. Clicking an element emits a
//! fire-and-forget GET against a dev-server endpoint; the server side of that
//! contract parses the query, validates the requested editor against a closed
//! allow-list and answers with a command the host process spawns. Both halves
//! live here so the query format is pinned in one place.

use std::path::{Path, PathBuf};

use crate::code_info::CodeInfo;

/// Endpoint path the client fires its launch request at.
pub const LAUNCH_EDITOR_ENDPOINT: &str = "/__open-in-editor";

/// Editors the server is willing to spawn. Anything else must be opened from
/// the client through a URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustedEditor {
    VsCode,
    VsCodeInsiders,
    VsCodium,
    VsCodiumInsiders,
    Codium,
    Cursor,
    WebStorm,
    AppCode,
    Idea,
    PhpStorm,
    PyCharm,
    RubyMine,
    Goland,
    Rider,
    Sublime,
    Zed,
    Vim,
    Neovim,
    Emacs,
}

impl TrustedEditor {
    /// The binary name, which is also the wire identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            TrustedEditor::VsCode => "code",
            TrustedEditor::VsCodeInsiders => "code-insiders",
            TrustedEditor::VsCodium => "vscodium",
            TrustedEditor::VsCodiumInsiders => "vscodium-insiders",
            TrustedEditor::Codium => "codium",
            TrustedEditor::Cursor => "cursor",
            TrustedEditor::WebStorm => "webstorm",
            TrustedEditor::AppCode => "appcode",
            TrustedEditor::Idea => "idea",
            TrustedEditor::PhpStorm => "phpstorm",
            TrustedEditor::PyCharm => "pycharm",
            TrustedEditor::RubyMine => "rubymine",
            TrustedEditor::Goland => "goland",
            TrustedEditor::Rider => "rider",
            TrustedEditor::Sublime => "subl",
            TrustedEditor::Zed => "zed",
            TrustedEditor::Vim => "vim",
            TrustedEditor::Neovim => "nvim",
            TrustedEditor::Emacs => "emacs",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        const ALL: [TrustedEditor; 19] = [
            TrustedEditor::VsCode,
            TrustedEditor::VsCodeInsiders,
            TrustedEditor::VsCodium,
            TrustedEditor::VsCodiumInsiders,
            TrustedEditor::Codium,
            TrustedEditor::Cursor,
            TrustedEditor::WebStorm,
            TrustedEditor::AppCode,
            TrustedEditor::Idea,
            TrustedEditor::PhpStorm,
            TrustedEditor::PyCharm,
            TrustedEditor::RubyMine,
            TrustedEditor::Goland,
            TrustedEditor::Rider,
            TrustedEditor::Sublime,
            TrustedEditor::Zed,
            TrustedEditor::Vim,
            TrustedEditor::Neovim,
            TrustedEditor::Emacs,
        ];
        ALL.into_iter().find(|editor| editor.as_str() == value)
    }

    fn is_vscode_family(self) -> bool {
        matches!(
            self,
            TrustedEditor::VsCode
                | TrustedEditor::VsCodeInsiders
                | TrustedEditor::VsCodium
                | TrustedEditor::VsCodiumInsiders
                | TrustedEditor::Codium
                | TrustedEditor::Cursor
        )
    }

    fn is_jetbrains_family(self) -> bool {
        matches!(
            self,
            TrustedEditor::WebStorm
                | TrustedEditor::AppCode
                | TrustedEditor::Idea
                | TrustedEditor::PhpStorm
                | TrustedEditor::PyCharm
                | TrustedEditor::RubyMine
                | TrustedEditor::Goland
                | TrustedEditor::Rider
        )
    }
}

/// Rejections answered as 400 with the message as body. An unknown editor is
/// never silently replaced with a default.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EditorLaunchError {
    #[error("required query param \"fileName\" is missing")]
    MissingFileName,
    #[error("editor \"{editor}\" is not trusted on this server; open it from the client via its URL scheme")]
    UntrustedEditor { editor: String },
    #[error("cannot parse the configured editor command: {reason}")]
    BadCommandOverride { reason: String },
    #[error("no editor requested and none configured")]
    NoEditor,
}

impl EditorLaunchError {
    pub fn status(&self) -> u16 {
        400
    }
}

/// Parsed query of one launch request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchEditorParams {
    pub file_name: String,
    pub line_number: Option<u32>,
    pub col_number: Option<u32>,
    pub editor: Option<TrustedEditor>,
}

impl LaunchEditorParams {
    /// Parse a raw query string (`fileName=...&lineNumber=...`). Numbers that
    /// fail to parse are treated as absent; an editor outside the allow-list
    /// is rejected.
    pub fn from_query(query: &str) -> Result<Self, EditorLaunchError> {
        let mut file_name = None;
        let mut line_number = None;
        let mut col_number = None;
        let mut editor = None;

        for pair in query.trim_start_matches('?').split('&') {
            let (key, value) = match pair.split_once('=') {
                Some(split) => split,
                None => continue,
            };
            let value = decode_component(value);
            match key {
                "fileName" if !value.is_empty() => file_name = Some(value),
                "lineNumber" => line_number = value.parse().ok(),
                "colNumber" => col_number = value.parse().ok(),
                "editor" => {
                    editor = Some(TrustedEditor::parse(&value).ok_or(
                        EditorLaunchError::UntrustedEditor {
                            editor: value.clone(),
                        },
                    )?);
                }
                _ => {}
            }
        }

        Ok(Self {
            file_name: file_name.ok_or(EditorLaunchError::MissingFileName)?,
            line_number,
            col_number,
            editor,
        })
    }
}

/// Server-side configuration for the endpoint.
#[derive(Debug, Clone, Default)]
pub struct LaunchConfig {
    /// Root relative file names resolve against.
    pub project_cwd: PathBuf,
    /// Editor used when the request names none.
    pub fallback_editor: Option<TrustedEditor>,
    /// Full command override, split shell-style; the file argument is
    /// appended. Takes precedence over any editor choice.
    pub command_override: Option<String>,
}

/// Command the host spawns to open the editor. Never executed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// Handle one launch request: parse, validate, build the spawn command.
/// `Ok` maps to a 200 response, `Err` to a 400 with the error text as body.
pub fn handle_launch_request(
    query: &str,
    config: &LaunchConfig,
) -> Result<LaunchCommand, EditorLaunchError> {
    let params = LaunchEditorParams::from_query(query)?;

    let path = config.project_cwd.join(&params.file_name);
    let located = path_with_position(&path, params.line_number, params.col_number);

    if let Some(command) = &config.command_override {
        let mut words =
            shell_words::split(command).map_err(|err| EditorLaunchError::BadCommandOverride {
                reason: err.to_string(),
            })?;
        if words.is_empty() {
            return Err(EditorLaunchError::BadCommandOverride {
                reason: "empty command".to_owned(),
            });
        }
        let program = words.remove(0);
        words.push(located);
        return Ok(LaunchCommand {
            program,
            args: words,
        });
    }

    let editor = params
        .editor
        .or(config.fallback_editor)
        .ok_or(EditorLaunchError::NoEditor)?;

    let args = if editor.is_vscode_family() {
        vec!["-g".to_owned(), located]
    } else if editor.is_jetbrains_family() {
        match params.line_number {
            Some(line) => vec![
                "--line".to_owned(),
                line.to_string(),
                path.to_string_lossy().into_owned(),
            ],
            None => vec![path.to_string_lossy().into_owned()],
        }
    } else {
        vec![located]
    };

    Ok(LaunchCommand {
        program: editor.as_str().to_owned(),
        args,
    })
}

fn path_with_position(path: &Path, line: Option<u32>, col: Option<u32>) -> String {
    let mut located = path.to_string_lossy().into_owned();
    if let Some(line) = line {
        located.push_str(&format!(":{line}"));
        if let Some(col) = col {
            located.push_str(&format!(":{col}"));
        }
    }
    located
}

/// Build the client-side GET query for [`LAUNCH_EDITOR_ENDPOINT`]. Relative
/// paths are preferred so the server resolves against its own project root.
/// Returns `None` (after logging) when the code info has no file name.
pub fn goto_server_editor(
    code_info: &CodeInfo,
    editor: Option<TrustedEditor>,
    endpoint: &str,
) -> Option<String> {
    let file_name = code_info
        .relative_path
        .as_deref()
        .or(code_info.absolute_path.as_deref());
    let Some(file_name) = file_name else {
        tracing::error!("cannot open editor without a source file name");
        return None;
    };

    let mut url = format!("{endpoint}?fileName={}", encode_component(file_name));
    if code_info.line_number > 0 {
        url.push_str(&format!("&lineNumber={}", code_info.line_number));
    }
    if code_info.column_number > 0 {
        url.push_str(&format!("&colNumber={}", code_info.column_number));
    }
    if let Some(editor) = editor {
        url.push_str(&format!("&editor={}", editor.as_str()));
    }
    Some(url)
}

/// `vscode://file/...` URL; requires an absolute path.
pub fn goto_vscode(code_info: &CodeInfo, insiders: bool) -> Option<String> {
    let absolute = require_absolute(code_info)?;
    let schema = if insiders { "vscode-insiders" } else { "vscode" };
    Some(format!(
        "{schema}://file/{absolute}:{}:{}",
        code_info.line_number, code_info.column_number
    ))
}

/// `cursor://open?...` URL; requires an absolute path.
pub fn goto_cursor(code_info: &CodeInfo) -> Option<String> {
    let absolute = require_absolute(code_info)?;
    Some(format!(
        "cursor://open?file={absolute}&line={}&column={}",
        code_info.line_number, code_info.column_number
    ))
}

/// `webstorm://open?...` URL; requires an absolute path.
pub fn goto_webstorm(code_info: &CodeInfo) -> Option<String> {
    let absolute = require_absolute(code_info)?;
    Some(format!(
        "webstorm://open?file={absolute}&line={}&column={}",
        code_info.line_number, code_info.column_number
    ))
}

fn require_absolute(code_info: &CodeInfo) -> Option<&str> {
    let absolute = code_info.absolute_path.as_deref();
    if absolute.is_none() {
        tracing::error!("cannot open editor without an absolute source path");
    }
    absolute
}

fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn decode_component(value: &str) -> String {
    let mut out = Vec::with_capacity(value.len());
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            // decoded byte-wise: the escape may sit next to (or inside a
            // malformed run of) multibyte UTF-8, so slicing the &str here
            // would panic on untrusted queries
            b'%' => {
                let hi = bytes.get(i + 1).copied().and_then(hex_value);
                let lo = bytes.get(i + 2).copied().and_then(hex_value);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
