//! Fixtures shared by the unit tests: throwaway git sources and a one-shot
//! HTTP responder for the remote version resource.

use git2::{Repository, Signature};
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;

/// Creates a non-bare repository at `path` with a README and, unless
/// `version` is empty, a VERSION marker. Returns `path`.
pub fn init_source(path: &Path, version: &str) -> PathBuf {
    fs::create_dir_all(path).unwrap();
    Repository::init(path).unwrap();
    commit_file(path, "README.md", "# distribution\n", "initial");
    if !version.is_empty() {
        commit_file(path, "VERSION", &format!("{version}\n"), "version");
    }
    path.to_path_buf()
}

/// Writes `name` in the repository at `repo_path` and commits it on HEAD.
pub fn commit_file(repo_path: &Path, name: &str, content: &str, message: &str) {
    let repo = Repository::open(repo_path).unwrap();
    fs::write(repo_path.join(name), content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("tether", "tether@localhost").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

/// Serves a single HTTP response and returns the URL to request it from.
pub fn serve_once(status: u16, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}/VERSION")
}
