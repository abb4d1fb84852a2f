//! Shared fixtures for end-to-end pipeline tests.

use std::fs;
use std::path::Path;

/// Write one source JSON document under `dir/pmc_json/<name>.json`.
pub fn write_pmc_doc(root: &Path, name: &str, paper_id: &str, abstract_text: &str, body_text: &str) {
    write_doc_in(root, "pmc_json", name, paper_id, abstract_text, body_text);
}

/// Write one source JSON document under `dir/pdf_json/<name>.json`.
pub fn write_pdf_doc(root: &Path, name: &str, paper_id: &str, abstract_text: &str, body_text: &str) {
    write_doc_in(root, "pdf_json", name, paper_id, abstract_text, body_text);
}

fn write_doc_in(root: &Path, subdir: &str, name: &str, paper_id: &str, abstract_text: &str, body_text: &str) {
    let dir = root.join(subdir);
    fs::create_dir_all(&dir).unwrap();
    let contents = serde_json::json!({
        "paper_id": paper_id,
        "metadata": {"title": format!("title for {paper_id}")},
        "abstract": [{"text": abstract_text}],
        "body_text": [{"text": body_text}],
    });
    fs::write(dir.join(name), serde_json::to_vec(&contents).unwrap()).unwrap();
}

/// A small three-document corpus: `["virus","virus","cell"]`,
/// `["cell","host"]`, `["virus","host","host"]`.
pub fn write_virus_cell_host_corpus(root: &Path) {
    write_pmc_doc(root, "doc0.json", "p0", "virus virus", "cell");
    write_pmc_doc(root, "doc1.json", "p1", "cell", "host");
    write_pmc_doc(root, "doc2.json", "p2", "virus", "host host");
}
