//! Parsers for the markdown documents backing groups and commands.
//!
//! Each group directory holds a `readme.md` listing its subgroups and
//! commands; each command has its own `_<name>.md` listing its versions,
//! the API resources behind every version, and usage examples.
//!
//! Group documents are parsed leniently (unknown sections are skipped) and
//! yield a [`CommandGroup`] whose children are all unresolved placeholders.
//! Command documents follow a strict layout:
//!
//! ````text
//! # [Command] _vm deallocate_
//!
//! Deallocate a VM.
//!
//! Optional long help line.
//!
//! ## Versions
//!
//! ### [2017-03-30](/Resources/...) **Stable**
//!
//! <!-- mgmt-plane /subscriptions/{}/.../deallocate 2017-03-30 -->
//!
//! #### examples
//!
//! - Deallocate a VM.
//!     ```bash
//!         vm deallocate --name MyVm
//!     ```
//! ````

use std::sync::LazyLock;

use command_catalog_core::{
    Command, CommandGroup, CommandVersion, Example, Help, Locator, Plane, ROOT_NAME, Resource,
    relative_names,
};
use regex::Regex;

use crate::error::DocumentError;

static PATTERNS: LazyLock<DocumentPatterns> = LazyLock::new(DocumentPatterns::new);

struct DocumentPatterns {
    command_title: Regex,
    version_header: Regex,
    resource: Regex,
    list_item: Regex,
}

impl DocumentPatterns {
    fn new() -> Self {
        Self {
            command_title: Regex::new(r"^# \[Command\] _(?P<names>[A-Za-z0-9- ]+)_$")
                .expect("static regex must compile"),
            version_header: Regex::new(
                r"^### \[(?P<name>[A-Za-z0-9-]+)\]\((?P<link>.*)\) \*\*(?P<stage>.*)\*\*$",
            )
            .expect("static regex must compile"),
            resource: Regex::new(
                r"^<!-- (?P<plane>\S+) (?P<id>\S+) (?P<version>\S+) (?:(?P<subresource>\S+) )?-->$",
            )
            .expect("static regex must compile"),
            list_item: Regex::new(r"^- \[(?P<name>[^\]]+)\]\((?P<uri>[^)]*)\)")
                .expect("static regex must compile"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Groups,
    Commands,
    Other,
}

type Entries = Vec<(String, Locator)>;

/// Parses a group document.
///
/// `names` is the group's path; an empty path (or `["aaz"]`) parses the
/// root document. Listed children become placeholders carrying their path,
/// document uri and the short help shown in the listing.
///
/// # Errors
///
/// Returns a [`DocumentError`] for a malformed `- [name](uri)` entry under
/// `## Groups` or `## Commands`, or a name listed twice in one section.
/// Other sections are skipped.
///
/// # Examples
///
/// ```
/// use command_catalog_db::parse_command_group;
///
/// let text = "# [Group] _vm_\n\nManage VMs.\n\n## Commands\n\n- [start](/Commands/vm/_start.md)\n: Start a VM.\n";
/// let group = parse_command_group(text, &["vm".to_string()]).unwrap();
/// assert_eq!(group.help.unwrap().short, "Manage VMs.");
/// let locator = group.commands.get_raw("start").unwrap().as_unresolved().unwrap();
/// assert_eq!(locator.names, vec!["vm", "start"]);
/// assert_eq!(locator.short_help.as_deref(), Some("Start a VM."));
/// ```
pub fn parse_command_group(text: &str, names: &[String]) -> Result<CommandGroup, DocumentError> {
    let parent = relative_names(names);

    let mut title_seen = false;
    let mut short_help: Option<String> = None;
    let mut long_help: Vec<String> = Vec::new();
    let mut section: Option<Section> = None;
    let mut in_fence = false;
    let mut prev_nonempty = false;
    let mut groups: Entries = Vec::new();
    let mut commands: Entries = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();

        if line.starts_with("\"\"\"") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if line.starts_with("# ") && !title_seen {
            title_seen = true;
        } else if let Some(heading) = line.strip_prefix("## ") {
            section = Some(match heading {
                "Groups" | "Subgroups" => Section::Groups,
                "Commands" => Section::Commands,
                _ => Section::Other,
            });
        } else if section.is_none() && !line.is_empty() {
            if let Some(short) = short_help.as_mut() {
                if long_help.is_empty() && prev_nonempty {
                    short.push('\n');
                    short.push_str(line);
                } else {
                    long_help.push(line.to_string());
                }
            } else {
                short_help = Some(line.to_string());
            }
        } else if line.starts_with("- [") {
            if let Some(entries) = current_entries(section, &mut groups, &mut commands) {
                let caps = PATTERNS
                    .list_item
                    .captures(line)
                    .ok_or_else(|| DocumentError::new(idx + 1, format!("malformed entry '{line}'")))?;
                let name = caps["name"].to_string();
                if entries.iter().any(|(existing, _)| *existing == name) {
                    return Err(DocumentError::new(idx + 1, format!("duplicate entry '{name}'")));
                }
                let mut child = parent.to_vec();
                child.push(name.clone());
                entries.push((name, Locator::new(child, &caps["uri"])));
            }
        } else if let Some(summary) = line.strip_prefix(": ") {
            if let Some((_, locator)) = current_entries(section, &mut groups, &mut commands)
                .and_then(|entries| entries.last_mut())
            {
                locator.short_help = Some(summary.to_string());
            }
        } else if !line.is_empty() && prev_nonempty {
            if let Some((_, locator)) = current_entries(section, &mut groups, &mut commands)
                .and_then(|entries| entries.last_mut())
            {
                let short = locator.short_help.get_or_insert_with(String::new);
                if !short.is_empty() {
                    short.push('\n');
                }
                short.push_str(line);
            }
        }
        prev_nonempty = !line.is_empty();
    }

    let mut group = CommandGroup::new(if parent.is_empty() {
        vec![ROOT_NAME.to_string()]
    } else {
        parent.to_vec()
    });
    group.help = short_help.map(|short| Help::new(short).with_lines(long_help));
    for (name, locator) in groups {
        group.command_groups.insert_unresolved(name, locator);
    }
    for (name, locator) in commands {
        group.commands.insert_unresolved(name, locator);
    }
    Ok(group)
}

fn current_entries<'v>(
    section: Option<Section>,
    groups: &'v mut Entries,
    commands: &'v mut Entries,
) -> Option<&'v mut Entries> {
    match section {
        Some(Section::Groups) => Some(groups),
        Some(Section::Commands) => Some(commands),
        Some(Section::Other) | None => None,
    }
}

/// Line cursor over a command document.
struct Cursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().map(str::trim_end).collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn skip_blank(&mut self) {
        while self.peek().is_some_and(str::is_empty) {
            self.pos += 1;
        }
    }

    /// Error at the line under the cursor.
    fn error(&self, reason: impl Into<String>) -> DocumentError {
        DocumentError::new(self.pos + 1, reason)
    }

    fn expect(&mut self, expected: &str) -> Result<(), DocumentError> {
        if self.peek() != Some(expected) {
            return Err(self.error(format!("expected '{}'", expected.trim())));
        }
        self.pos += 1;
        Ok(())
    }
}

/// Parses a command document into a fully loaded [`Command`] named `names`.
///
/// The `Stable` stage is stored as unset and versions are sorted by name.
///
/// # Errors
///
/// Returns a [`DocumentError`] pointing at the first line that breaks the
/// layout: a missing title, short summary or `## Versions` section, a
/// malformed version header or resource line, a version without resources,
/// or an unterminated example block.
pub fn parse_command(text: &str, names: &[String]) -> Result<Command, DocumentError> {
    let mut cur = Cursor::new(text);

    cur.skip_blank();
    match cur.peek() {
        Some(line) if PATTERNS.command_title.is_match(line) => {
            cur.pos += 1;
        }
        _ => return Err(cur.error("expected '# [Command] _<names>_' title")),
    }

    let mut short: Vec<&str> = Vec::new();
    let mut lines: Vec<String> = Vec::new();
    let mut after_short = false;
    loop {
        let Some(line) = cur.peek() else {
            return Err(cur.error("missing '## Versions' section"));
        };
        if line == "## Versions" {
            cur.pos += 1;
            break;
        }
        if line.starts_with('#') {
            return Err(cur.error(format!("unexpected heading '{line}'")));
        }
        cur.pos += 1;
        if line.is_empty() {
            after_short |= !short.is_empty();
        } else if after_short {
            lines.push(line.trim().to_string());
        } else {
            short.push(line.trim());
        }
    }
    if short.is_empty() {
        return Err(cur.error("missing short summary"));
    }

    let mut versions = Vec::new();
    loop {
        cur.skip_blank();
        let Some(line) = cur.peek() else {
            break;
        };
        let caps = PATTERNS
            .version_header
            .captures(line)
            .ok_or_else(|| cur.error("expected '### [version](link) **Stage**'"))?;
        cur.pos += 1;

        let mut version = CommandVersion::new(&caps["name"]);
        version.set_stage(Some(&caps["stage"]));

        cur.skip_blank();
        while let Some(line) = cur.peek() {
            if !line.starts_with("<!--") {
                break;
            }
            let resource = parse_resource(line).map_err(|reason| cur.error(reason))?;
            version.resources.push(resource);
            cur.pos += 1;
        }
        if version.resources.is_empty() {
            return Err(cur.error(format!("version {} has no resources", version.name)));
        }

        cur.skip_blank();
        if cur.peek() == Some("#### examples") {
            cur.pos += 1;
            version.examples = parse_examples(&mut cur)?;
        }
        versions.push(version);
    }
    if versions.is_empty() {
        return Err(cur.error("no versions listed"));
    }

    let mut command = Command::new(names.to_vec());
    command.help = Some(Help::new(short.join("\n")).with_lines(lines));
    command.versions = versions;
    command.sort_versions();
    Ok(command)
}

fn parse_resource(line: &str) -> Result<Resource, String> {
    let caps = PATTERNS
        .resource
        .captures(line)
        .ok_or_else(|| format!("malformed resource line '{line}'"))?;
    let plane: Plane = caps["plane"].parse()?;
    let mut resource = Resource::new(plane, &caps["id"], &caps["version"]);
    resource.subresource = caps.name("subresource").map(|m| m.as_str().to_string());
    Ok(resource)
}

fn parse_examples(cur: &mut Cursor<'_>) -> Result<Vec<Example>, DocumentError> {
    let mut examples = Vec::new();
    loop {
        cur.skip_blank();
        let Some(desc) = cur.peek().and_then(|line| line.strip_prefix("- ")) else {
            break;
        };
        cur.pos += 1;
        cur.expect("    ```bash")?;

        let mut commands = Vec::new();
        loop {
            let Some(line) = cur.peek() else {
                return Err(cur.error("unterminated example block"));
            };
            if line == "    ```" {
                cur.pos += 1;
                break;
            }
            let command = line
                .strip_prefix("        ")
                .ok_or_else(|| cur.error("example commands must be indented by 8 spaces"))?;
            commands.push(command.to_string());
            cur.pos += 1;
        }
        examples.push(Example::new(desc, commands));
    }
    Ok(examples)
}
