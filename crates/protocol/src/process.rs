//! Process ancestry, used to pair pre-compaction hooks with the servers spawned by the same
//! client.

use std::path::Path;

pub const MAX_ANCESTOR_DEPTH: usize = 10;

/// `(pid, name)` pairs from the current process up towards init, at most `max_depth` long.
///
/// Reads `/proc` where available; elsewhere only the current process is reported.
pub fn ancestor_chain(max_depth: usize) -> Vec<(u32, String)> {
    chain_from(Path::new("/proc"), std::process::id(), max_depth)
}

pub(crate) fn chain_from(proc_root: &Path, start: u32, max_depth: usize) -> Vec<(u32, String)> {
    let mut chain = Vec::new();
    let mut pid = start;
    while chain.len() < max_depth && pid != 0 {
        if chain.iter().any(|(seen, _)| *seen == pid) {
            break;
        }
        match read_stat(proc_root, pid) {
            Some((name, parent)) => {
                chain.push((pid, name));
                pid = parent;
            }
            None => {
                if chain.is_empty() {
                    chain.push((pid, "?".to_string()));
                }
                break;
            }
        }
    }
    chain
}

/// `(comm, ppid)` from `/proc/<pid>/stat`.
fn read_stat(proc_root: &Path, pid: u32) -> Option<(String, u32)> {
    let raw = std::fs::read_to_string(proc_root.join(pid.to_string()).join("stat")).ok()?;
    parse_stat(&raw)
}

fn parse_stat(raw: &str) -> Option<(String, u32)> {
    // The command name may itself contain spaces and parentheses.
    let open = raw.find('(')?;
    let close = raw.rfind(')')?;
    let name = raw.get(open + 1..close)?.to_string();
    let mut fields = raw.get(close + 1..)?.split_whitespace();
    let _state = fields.next()?;
    let parent = fields.next()?.parse().ok()?;
    Some((name, parent))
}
