#![forbid(unsafe_code)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()));
    let Some(git_dir) = find_git_dir(&manifest_dir) else {
        return;
    };

    let head_path = git_dir.join("HEAD");
    println!("cargo:rerun-if-changed={}", head_path.display());

    let Some(sha) = head_sha(&git_dir, &head_path) else {
        return;
    };
    let short = sha.chars().take(12).collect::<String>();
    println!("cargo:rustc-env=RL_GIT_SHA={short}");
}

fn head_sha(git_dir: &Path, head_path: &Path) -> Option<String> {
    let head = fs::read_to_string(head_path).ok()?;
    let head = head.trim();
    let sha = match head.strip_prefix("ref:") {
        Some(ref_path) => resolve_ref(git_dir, ref_path.trim())?,
        None => head.to_string(),
    };
    let sha = sha.trim().to_string();
    if sha.is_empty() { None } else { Some(sha) }
}

fn find_git_dir(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        let dot_git = dir.join(".git");
        if dot_git.is_dir() {
            return Some(dot_git);
        }
        // Worktrees and submodules keep a `gitdir:` pointer file instead.
        let text = fs::read_to_string(&dot_git).ok()?;
        let target = text.lines().next()?.strip_prefix("gitdir:")?.trim();
        Some(dir.join(target))
    })
}

fn resolve_ref(git_dir: &Path, ref_path: &str) -> Option<String> {
    let loose = git_dir.join(ref_path);
    if let Ok(text) = fs::read_to_string(&loose) {
        println!("cargo:rerun-if-changed={}", loose.display());
        return Some(text.trim().to_string());
    }

    let packed = git_dir.join("packed-refs");
    let text = fs::read_to_string(&packed).ok()?;
    println!("cargo:rerun-if-changed={}", packed.display());
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('^'))
        .filter_map(|line| line.split_once(' '))
        .find(|(_, name)| *name == ref_path)
        .map(|(sha, _)| sha.to_string())
}
