//! Bundle archives: wrapping a bare module and extracting one.

use camino::Utf8Path;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use governant_types::ids::BUNDLE_MODULE_ENTRY;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::artifact::{Artifact, ArtifactKind, MODULE_SUFFIX};
use crate::error::{PolicyError, PolicyResult};
use crate::scratch::{BUNDLE_PREFIX, ScratchFile};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Wrap a bare module into a temporary `.tar.gz` holding a single `policy.wasm` entry.
///
/// The returned guard deletes the archive when dropped.
pub fn wrap_as_bundle(module: &Utf8Path, dir: Option<&Path>) -> PolicyResult<ScratchFile> {
    let bytes = std::fs::read(module).map_err(|e| bundle_err(module, e))?;

    let file = ScratchFile::create(BUNDLE_PREFIX, ".tar.gz", dir)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    let mut header = tar::Header::new_gnu();
    header.set_size(bytes.len() as u64);
    header.set_mode(0o644);
    builder
        .append_data(&mut header, BUNDLE_MODULE_ENTRY, bytes.as_slice())
        .map_err(|e| bundle_err(module, e))?;

    let file = builder
        .into_inner()
        .and_then(|gz| gz.finish())
        .map_err(|e| bundle_err(module, e))?;

    tracing::debug!(module = %module, size = bytes.len(), "wrapped module as temporary bundle");
    Ok(ScratchFile::from(file))
}

/// Read the compiled module an artifact carries.
///
/// - module: the file itself
/// - directory: its `policy.wasm`
/// - bundle: the `policy.wasm` entry, else the first `*.wasm` entry
pub fn read_module_bytes(artifact: &Artifact) -> PolicyResult<Vec<u8>> {
    let path = artifact.path();
    match artifact.kind() {
        ArtifactKind::Module => std::fs::read(path).map_err(|e| bundle_err(path, e)),
        ArtifactKind::Directory => {
            let module = path.join(BUNDLE_MODULE_ENTRY);
            if !module.is_file() {
                return Err(PolicyError::ArtifactNotFound(module));
            }
            std::fs::read(&module).map_err(|e| bundle_err(&module, e))
        }
        ArtifactKind::Bundle => extract_module(path),
    }
}

fn extract_module(path: &Utf8Path) -> PolicyResult<Vec<u8>> {
    let mut magic = [0u8; 2];
    let is_gzip = File::open(path)
        .and_then(|mut f| f.read(&mut magic))
        .map_err(|e| bundle_err(path, e))?
        == 2
        && magic == GZIP_MAGIC;

    let file = File::open(path).map_err(|e| bundle_err(path, e))?;
    let reader: Box<dyn Read> = if is_gzip {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut archive = tar::Archive::new(reader);
    let mut fallback: Option<Vec<u8>> = None;
    for entry in archive.entries().map_err(|e| bundle_err(path, e))? {
        let mut entry = entry.map_err(|e| bundle_err(path, e))?;
        let name = entry
            .path()
            .map_err(|e| bundle_err(path, e))?
            .to_string_lossy()
            .into_owned();
        let is_entry_module = name.trim_start_matches("./").trim_start_matches('/')
            == BUNDLE_MODULE_ENTRY;
        if !is_entry_module && (fallback.is_some() || !name.ends_with(MODULE_SUFFIX)) {
            continue;
        }
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| bundle_err(path, e))?;
        if is_entry_module {
            return Ok(bytes);
        }
        fallback = Some(bytes);
    }

    fallback.ok_or_else(|| PolicyError::MalformedModule {
        reason: format!("no {MODULE_SUFFIX} module inside bundle {path}"),
    })
}

fn bundle_err(path: &Utf8Path, source: std::io::Error) -> PolicyError {
    PolicyError::Bundle {
        path: path.to_path_buf(),
        source,
    }
}
