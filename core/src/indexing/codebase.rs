//! Codebase Indexer (spec §4.2.2): directory walk, sha256-based dedup,
//! best-effort symbol extraction, and the 50-line/10-line-overlap
//! fallback chunker for everything else.

use crate::error::Result;
use crate::storage::traits::{ContentKind, EmbeddingService, RawStore, SemanticStore, UpsertRow};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Raw Store namespace codebase snapshots are kept under, and whose
/// paired content-hash drives the skip-if-unchanged decision (spec §6:
/// `databases/raw_store/codebase_copies/`).
const NAMESPACE: &str = "codebase_copies";

/// Directories never walked into, regardless of depth (spec §4.2.2).
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "venv",
    ".venv",
    "__pycache__",
    "target",
    "build",
    "dist",
    ".idea",
    ".vscode",
    "coverage",
    ".pytest_cache",
    ".mypy_cache",
];

/// Extension -> language table (spec §4.2.2).
const LANGUAGE_TABLE: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("py", "python"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("go", "go"),
    ("java", "java"),
    ("rb", "ruby"),
    ("c", "c"),
    ("h", "c"),
    ("cpp", "cpp"),
    ("hpp", "cpp"),
];

fn language_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?;
    LANGUAGE_TABLE
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".." || SKIPPED_DIRS.contains(&name)
}

/// Walk `root`, returning every file whose extension is in the language
/// table, skipping hidden and vendor/cache directories.
pub fn walk_project(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_dir(root, &mut files)?;
    Ok(files)
}

fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(()),
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if path.is_dir() {
            if !is_skipped_dir(&name) {
                walk_dir(&path, out)?;
            }
        } else if language_for(&path).is_some() {
            out.push(path);
        }
    }
    Ok(())
}

/// sha256 of file bytes, used for the skip-if-unchanged decision (spec
/// §4.2.2).
#[must_use]
pub fn file_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Whether `file_id` needs (re-)indexing: its current sha256 differs from
/// the hash stored alongside its last-indexed snapshot (spec §4.2.2 "skip
/// if `sha256(file_bytes)` matches the stored value").
pub async fn needs_reindex(raw: &Arc<dyn RawStore>, file_id: &str, bytes: &[u8]) -> Result<bool> {
    let current = file_hash(bytes);
    let stored = raw.stored_hash(NAMESPACE, file_id).await?;
    Ok(stored.as_deref() != Some(current.as_str()))
}

/// Best-effort text decoding: UTF-8 first, otherwise a lossy fallback
/// (spec §4.2.2 "charset-sniff with confidence >= 0.7" — full
/// confidence-scored charset detection is out of scope here; the lossy
/// fallback covers the common case of a handful of non-UTF-8 bytes).
#[must_use]
pub fn decode_best_effort(bytes: &[u8]) -> String {
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

/// An extracted function symbol (spec §4.2.2).
#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    pub signature: String,
    pub body: String,
    pub docstring: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    pub is_async: bool,
}

/// Lightweight, regex-based Rust function extraction, standing in for
/// full AST parsing for the one supported language. Matches top-level and
/// nested `fn`/`async fn` items line-by-line; brace-balances to find the
/// body end.
#[must_use]
pub fn extract_rust_functions(source: &str) -> Vec<FunctionSymbol> {
    let lines: Vec<&str> = source.lines().collect();
    let fn_re = regex::Regex::new(r"^\s*(pub(?:\([^)]*\))?\s+)?(async\s+)?fn\s+(\w+)\s*(\([^)]*\))")
        .expect("rust fn pattern is valid");

    let mut symbols = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if let Some(captures) = fn_re.captures(lines[i]) {
            let name = captures[3].to_string();
            let signature = lines[i].trim().to_string();
            let is_async = captures.get(2).is_some();

            let docstring = doc_comment_above(&lines, i);

            let (end_line, body) = extract_brace_body(&lines, i);
            symbols.push(FunctionSymbol {
                name,
                signature,
                body,
                docstring,
                start_line: i,
                end_line,
                is_async,
            });
            i = end_line + 1;
        } else {
            i += 1;
        }
    }
    symbols
}

fn doc_comment_above(lines: &[&str], fn_line: usize) -> Option<String> {
    let mut doc_lines = Vec::new();
    let mut idx = fn_line;
    while idx > 0 {
        idx -= 1;
        let line = lines[idx].trim();
        if let Some(rest) = line.strip_prefix("///") {
            doc_lines.push(rest.trim().to_string());
        } else {
            break;
        }
    }
    if doc_lines.is_empty() {
        None
    } else {
        doc_lines.reverse();
        Some(doc_lines.join("\n"))
    }
}

fn extract_brace_body(lines: &[&str], start: usize) -> (usize, String) {
    let mut depth = 0i32;
    let mut started = false;
    let mut end = start;
    let mut body_lines = Vec::new();

    for (offset, line) in lines.iter().enumerate().skip(start) {
        body_lines.push(*line);
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    started = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        end = offset;
        if started && depth <= 0 {
            break;
        }
    }
    (end, body_lines.join("\n"))
}

/// A chunk of source code ready to embed (spec §4.2.2).
#[derive(Debug, Clone)]
pub struct CodeChunk {
    pub chunk_id: String,
    pub embedding_text: String,
    pub start_line: usize,
    pub end_line: usize,
    pub kind: &'static str,
    pub symbol_name: Option<String>,
}

const FALLBACK_WINDOW: usize = 50;
const FALLBACK_OVERLAP: usize = 10;
const FALLBACK_STEP: usize = FALLBACK_WINDOW - FALLBACK_OVERLAP;

/// Fallback chunking for unsupported/unparseable content: 50-line sliding
/// windows with 10-line overlap (spec §4.2.2).
#[must_use]
pub fn fallback_chunks(file_id: &str, source: &str) -> Vec<CodeChunk> {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut index = 0;
    loop {
        let end = (start + FALLBACK_WINDOW).min(lines.len());
        let text = lines[start..end].join("\n");
        let embedding_text: String = text.chars().take(1000).collect();

        chunks.push(CodeChunk {
            chunk_id: format!("{file_id}_block_{index}"),
            embedding_text,
            start_line: start,
            end_line: end.saturating_sub(1),
            kind: "block",
            symbol_name: None,
        });

        index += 1;
        if end >= lines.len() {
            break;
        }
        start += FALLBACK_STEP;
    }
    chunks
}

/// Build the embedding text for a function symbol (spec §4.2.2).
#[must_use]
pub fn function_embedding_text(function: &FunctionSymbol) -> String {
    let body_preview: String = function.body.chars().take(500).collect();
    let description = function
        .docstring
        .as_ref()
        .map(|d| format!("\n[Description: {d}]"))
        .unwrap_or_default();
    format!(
        "Function: {}\nSignature: {}{description}\n{body_preview}",
        function.name, function.signature
    )
}

/// Index one source file: skip if unchanged since the last snapshot
/// (spec §4.2.2), else extract supported-language symbols or fall back to
/// sliding chunks, embed each, upsert into `codebase` plus `code_symbols`,
/// and write the new snapshot + hash back to the Raw Store.
pub async fn index_file(
    raw: &Arc<dyn RawStore>,
    semantic: &Arc<dyn SemanticStore>,
    embeddings: &Arc<dyn EmbeddingService>,
    file_id: &str,
    path: &Path,
    bytes: &[u8],
    source: &str,
) -> Result<super::IndexOutcome> {
    if !needs_reindex(raw, file_id, bytes).await? {
        return Ok(super::IndexOutcome {
            source_id: file_id.to_string(),
            chunks_written: 0,
            facts_written: 0,
            skipped_unchanged: true,
        });
    }

    let outcome = index_file_unconditionally(semantic, embeddings, file_id, path, source).await?;
    raw.put(NAMESPACE, file_id, bytes.to_vec()).await?;
    Ok(outcome)
}

/// The actual extraction/embedding/upsert work, run once `index_file` has
/// already decided the file changed.
async fn index_file_unconditionally(
    semantic: &Arc<dyn SemanticStore>,
    embeddings: &Arc<dyn EmbeddingService>,
    file_id: &str,
    path: &Path,
    source: &str,
) -> Result<super::IndexOutcome> {
    let language = language_for(path);
    let mut code_rows = Vec::new();
    let mut symbol_rows = Vec::new();

    if language == Some("rust") {
        let functions = extract_rust_functions(source);
        for function in &functions {
            let text = function_embedding_text(function);
            let embedding = embeddings.embed(&text, ContentKind::Code).await?;
            let id = format!("{file_id}_{}", function.name);
            code_rows.push(UpsertRow {
                id: id.clone(),
                embedding: Some(embedding.clone()),
                document: text.clone(),
                metadata: json!({
                    "kind": "function",
                    "name": function.name,
                    "start_line": function.start_line,
                    "end_line": function.end_line,
                    "is_async": function.is_async,
                }),
            });
            symbol_rows.push(UpsertRow {
                id,
                embedding: Some(embedding),
                document: text,
                metadata: json!({ "name": function.name, "file": file_id }),
            });
        }
        if !functions.is_empty() {
            semantic.upsert("codebase", code_rows).await?;
            semantic.upsert("code_symbols", symbol_rows).await?;
            return Ok(super::IndexOutcome {
                source_id: file_id.to_string(),
                chunks_written: functions.len(),
                facts_written: 0,
                skipped_unchanged: false,
            });
        }
    }

    let chunks = fallback_chunks(file_id, source);
    for chunk in &chunks {
        let embedding = embeddings.embed(&chunk.embedding_text, ContentKind::Code).await?;
        code_rows.push(UpsertRow {
            id: chunk.chunk_id.clone(),
            embedding: Some(embedding),
            document: chunk.embedding_text.clone(),
            metadata: json!({
                "kind": chunk.kind,
                "start_line": chunk.start_line,
                "end_line": chunk.end_line,
            }),
        });
    }
    if !code_rows.is_empty() {
        semantic.upsert("codebase", code_rows).await?;
    }

    Ok(super::IndexOutcome {
        source_id: file_id.to_string(),
        chunks_written: chunks.len(),
        facts_written: 0,
        skipped_unchanged: false,
    })
}

/// Outcome of an `index_project` walk (spec §6 `index_project` request
/// surface op: `{success, files_indexed}`, plus the §8.2 scenario's
/// `files_reindexed`/`files_skipped` accounting).
#[derive(Debug, Clone, Default)]
pub struct ProjectIndexReport {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
}

/// Walk `root`, indexing every file whose sha256 changed since its last
/// snapshot and skipping the rest (spec §4.2.2). A parse/read failure on
/// one file is an input error (spec §7) and does not abort the walk.
pub async fn index_project(
    raw: &Arc<dyn RawStore>,
    semantic: &Arc<dyn SemanticStore>,
    embeddings: &Arc<dyn EmbeddingService>,
    root: &Path,
) -> Result<ProjectIndexReport> {
    let mut report = ProjectIndexReport::default();

    for path in walk_project(root)? {
        let file_id = path.to_string_lossy().into_owned();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(_) => {
                report.files_failed += 1;
                continue;
            }
        };
        let source = decode_best_effort(&bytes);

        match index_file(raw, semantic, embeddings, &file_id, &path, &bytes, &source).await {
            Ok(outcome) if outcome.skipped_unchanged => report.files_skipped += 1,
            Ok(_) => report.files_indexed += 1,
            Err(_) => report.files_failed += 1,
        }
    }

    Ok(report)
}

/// Per-project metadata recorded alongside indexed files (spec §4.2.2).
#[derive(Debug, Clone, Default)]
pub struct ProjectMetadata {
    pub path: String,
    pub name: String,
    pub language_distribution: HashMap<String, usize>,
}

/// Compute language distribution across `files` by extension.
#[must_use]
pub fn language_distribution(files: &[PathBuf]) -> HashMap<String, usize> {
    let mut distribution = HashMap::new();
    for file in files {
        if let Some(lang) = language_for(file) {
            *distribution.entry(lang.to_string()).or_insert(0) += 1;
        }
    }
    distribution
}
