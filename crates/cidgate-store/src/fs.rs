//! # Filesystem Key-Value Store
//!
//! Keys of the form `{namespace}:{name}` are stored at
//! `{root}/{namespace}/{escaped-name}`. Bytes outside `[A-Za-z0-9._-]` in
//! the name are written as `%XX`, so every key maps to exactly one file and
//! can be recovered from its path when listing.
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a
//! reader never observes a half-written value.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::CacheError;
use crate::kv::KvStore;

const TMP_SUFFIX: &str = ".tmp";
const DEFAULT_NAMESPACE: &str = "_";

/// A [`KvStore`] backed by a directory tree.
#[derive(Debug, Clone)]
pub struct FsKvStore {
    root: PathBuf,
}

impl FsKvStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| CacheError::io(&root.display().to_string(), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let (namespace, name) = split_key(key);
        self.root.join(namespace).join(escape(name))
    }
}

fn split_key(key: &str) -> (&str, &str) {
    match key.split_once(':') {
        Some((ns, name))
            if !ns.is_empty() && ns.bytes().all(|b| b.is_ascii_lowercase() || b == b'-') =>
        {
            (ns, name)
        }
        _ => (DEFAULT_NAMESPACE, key),
    }
}

fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    // Keep escaped names from colliding with in-flight temp files.
    if out.ends_with(TMP_SUFFIX) {
        out.truncate(out.len() - TMP_SUFFIX.len());
        out.push_str("%2Etmp");
    }
    if out == "." || out == ".." {
        out = out.replace('.', "%2E");
    }
    out
}

fn unescape(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

impl KvStore for FsKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::io(key, e)),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let path = self.path_for(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| CacheError::io(key, e))?;
        }
        let mut tmp = path.clone().into_os_string();
        tmp.push(TMP_SUFFIX);
        let tmp = PathBuf::from(tmp);

        let write = || -> std::io::Result<()> {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(value)?;
            f.sync_all()?;
            fs::rename(&tmp, &path)
        };
        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            CacheError::io(key, e)
        })
    }

    fn remove(&self, key: &str) -> Result<bool, CacheError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::io(key, e)),
        }
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let root_key = self.root.display().to_string();
        let namespaces = match fs::read_dir(&self.root) {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&root_key, e)),
        };

        let mut keys = Vec::new();
        for ns_entry in namespaces {
            let ns_entry = ns_entry.map_err(|e| CacheError::io(&root_key, e))?;
            if !ns_entry.path().is_dir() {
                continue;
            }
            let Some(ns) = ns_entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let files = fs::read_dir(ns_entry.path()).map_err(|e| CacheError::io(&ns, e))?;
            for file in files {
                let file = file.map_err(|e| CacheError::io(&ns, e))?;
                let Some(fname) = file.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                if fname.ends_with(TMP_SUFFIX) {
                    continue;
                }
                let Some(name) = unescape(&fname) else {
                    continue;
                };
                let key = if ns == DEFAULT_NAMESPACE {
                    name
                } else {
                    format!("{ns}:{name}")
                };
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}
