use super::{DirEntry, Transport};
use stackbuild_proto::{codes, FsRequest, FsResponse};
use stackbuild_util::vpath;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// An in-process virtual tree answering sandbox calls.
///
/// Stands in for the host side of the sandbox boundary: embedders can seed
/// it with a project and hand it to [`SandboxFs`](super::SandboxFs). The root
/// `/` always exists.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    nodes: Mutex<BTreeMap<String, Node>>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from `(path, contents)` pairs.
    #[must_use]
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let transport = Self::new();
        for (path, contents) in files {
            transport.insert_file(path, contents.as_bytes());
        }
        transport
    }

    /// Add or replace a file, creating its parent directories.
    ///
    /// Ignored, with a warning, if an ancestor is a file.
    pub fn insert_file(&self, path: &str, data: &[u8]) {
        if let FsResponse::Error { message, .. } = self.handle(FsRequest::WriteFile {
            path: path.to_string(),
            data: data.to_vec(),
        }) {
            tracing::warn!(path, %message, "cannot seed file");
        }
    }

    /// All file paths currently in the tree, sorted.
    #[must_use]
    pub fn file_paths(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(_, node)| matches!(node, Node::File(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Node>> {
        self.nodes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, request: FsRequest) -> FsResponse {
        let mut nodes = self.lock();

        match request {
            FsRequest::Exists { path } => {
                let path = vpath::clean(&path);
                match lookup(&nodes, &path) {
                    Some(Node::File(_)) => FsResponse::Exists {
                        exists: true,
                        is_file: true,
                    },
                    Some(Node::Dir) => FsResponse::Exists {
                        exists: true,
                        is_file: false,
                    },
                    None => FsResponse::Exists {
                        exists: false,
                        is_file: false,
                    },
                }
            }
            FsRequest::ReadFile { path } => {
                let path = vpath::clean(&path);
                match lookup(&nodes, &path) {
                    Some(Node::File(data)) => FsResponse::Data { data: data.clone() },
                    Some(Node::Dir) => FsResponse::error(codes::FS_IO_ERROR, format!("{path} is a directory")),
                    None => not_found(&path),
                }
            }
            FsRequest::ReadDir { path, recursive } => {
                let path = vpath::clean(&path);
                match lookup(&nodes, &path) {
                    Some(Node::Dir) => FsResponse::Entries {
                        entries: list(&nodes, &path, recursive),
                    },
                    Some(Node::File(_)) => {
                        FsResponse::error(codes::FS_IO_ERROR, format!("{path} is not a directory"))
                    }
                    None => not_found(&path),
                }
            }
            FsRequest::WriteFile { path, data } => {
                let path = vpath::clean(&path);
                if matches!(lookup(&nodes, &path), Some(Node::Dir)) {
                    return FsResponse::error(codes::FS_IO_ERROR, format!("{path} is a directory"));
                }
                if let Err(response) = insert_parents(&mut nodes, &path) {
                    return response;
                }
                nodes.insert(path, Node::File(data));
                FsResponse::Done
            }
            FsRequest::Mkdir { path } => {
                let path = vpath::clean(&path);
                if matches!(lookup(&nodes, &path), Some(Node::File(_))) {
                    return FsResponse::error(codes::FS_IO_ERROR, format!("{path} is a file"));
                }
                if let Err(response) = insert_parents(&mut nodes, &path) {
                    return response;
                }
                if path != "/" {
                    nodes.insert(path, Node::Dir);
                }
                FsResponse::Done
            }
            FsRequest::Rename { from, to } => {
                let from = vpath::clean(&from);
                let to = vpath::clean(&to);
                if lookup(&nodes, &from).is_none() {
                    return not_found(&from);
                }
                if to == from || vpath::is_descendant(&to, &from) {
                    return FsResponse::error(
                        codes::FS_INVALID_REQUEST,
                        format!("cannot move {from} into itself"),
                    );
                }
                if let Err(response) = insert_parents(&mut nodes, &to) {
                    return response;
                }
                let moved: Vec<(String, Node)> = nodes
                    .iter()
                    .filter(|(p, _)| **p == from || vpath::is_descendant(p, &from))
                    .map(|(p, n)| (p.clone(), n.clone()))
                    .collect();
                for (old, _) in &moved {
                    nodes.remove(old);
                }
                for (old, node) in moved {
                    let new_path = format!("{to}{}", &old[from.len()..]);
                    nodes.insert(new_path, node);
                }
                FsResponse::Done
            }
            FsRequest::Unlink { path } => {
                let path = vpath::clean(&path);
                match lookup(&nodes, &path) {
                    Some(Node::File(_)) => {
                        nodes.remove(&path);
                        FsResponse::Done
                    }
                    Some(Node::Dir) => {
                        FsResponse::error(codes::FS_IO_ERROR, format!("{path} is a directory"))
                    }
                    None => not_found(&path),
                }
            }
        }
    }
}

impl Transport for MemoryTransport {
    fn call(&self, request: FsRequest) -> FsResponse {
        self.handle(request)
    }
}

static ROOT: Node = Node::Dir;

fn lookup<'a>(nodes: &'a BTreeMap<String, Node>, path: &str) -> Option<&'a Node> {
    if path == "/" {
        return Some(&ROOT);
    }
    nodes.get(path)
}

fn not_found(path: &str) -> FsResponse {
    FsResponse::error(codes::FS_NOT_FOUND, format!("no such file or directory: {path}"))
}

/// Create the missing ancestors of `path`. Fails without changes if one of
/// them is a file.
fn insert_parents(nodes: &mut BTreeMap<String, Node>, path: &str) -> Result<(), FsResponse> {
    let mut ancestors = Vec::new();
    let mut dir = vpath::parent(path);
    while dir != "/" && dir != "." {
        let next = vpath::parent(&dir);
        ancestors.push(dir);
        dir = next;
    }

    if let Some(file) = ancestors
        .iter()
        .find(|dir| matches!(nodes.get(dir.as_str()), Some(Node::File(_))))
    {
        return Err(FsResponse::error(
            codes::FS_IO_ERROR,
            format!("{file} is not a directory"),
        ));
    }

    for dir in ancestors {
        nodes.entry(dir).or_insert(Node::Dir);
    }
    Ok(())
}

fn list(nodes: &BTreeMap<String, Node>, dir: &str, recursive: bool) -> Vec<DirEntry> {
    let prefix = if dir == "/" {
        "/".to_string()
    } else {
        format!("{dir}/")
    };

    nodes
        .range(prefix.clone()..)
        .take_while(|(p, _)| p.starts_with(&prefix))
        .filter_map(|(p, node)| {
            let rel = &p[prefix.len()..];
            if rel.is_empty() || (!recursive && rel.contains('/')) {
                return None;
            }
            Some(DirEntry {
                name: rel.to_string(),
                is_dir: matches!(node, Node::Dir),
            })
        })
        .collect()
}
