//! Pipeline tests with test doubles for the collaborator traits.

mod ranking;

use crate::embeddings::EmbeddingProvider;
use crate::index::{IndexStorage, SqliteIndexStorage, VectorIndex};
use async_trait::async_trait;
use convopilot_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Embeds known texts to fixed vectors and everything else to `fallback`.
#[derive(Debug)]
pub(crate) struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: Vec<f32>,
}

impl FixedEmbedder {
    pub(crate) fn new(fallback: Vec<f32>) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback,
        }
    }

    pub(crate) fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn provider_name(&self) -> &str {
        "fixed"
    }

    fn model_name(&self) -> &str {
        "lookup-table"
    }

    fn dimensions(&self) -> usize {
        self.fallback.len()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| self.vectors.get(t).unwrap_or(&self.fallback).clone())
            .collect())
    }
}

/// SQLite storage that counts calls and can be told to fail every load.
pub(crate) struct CountingStorage {
    inner: SqliteIndexStorage,
    fail_loads: bool,
    saves: AtomicUsize,
    loads: AtomicUsize,
}

impl CountingStorage {
    pub(crate) fn new(path: &Path) -> Self {
        Self {
            inner: SqliteIndexStorage::new(path),
            fail_loads: false,
            saves: AtomicUsize::new(0),
            loads: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_loads(path: &Path) -> Self {
        Self {
            fail_loads: true,
            ..Self::new(path)
        }
    }

    pub(crate) fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub(crate) fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl IndexStorage for CountingStorage {
    fn save(&self, index: &VectorIndex) -> AppResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(index)
    }

    fn load(&self) -> AppResult<VectorIndex> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads {
            return Err(AppError::IndexLoad("simulated corruption".to_string()));
        }
        self.inner.load()
    }

    fn exists(&self) -> bool {
        self.inner.exists()
    }

    fn remove(&self) -> AppResult<()> {
        self.inner.remove()
    }

    fn location(&self) -> &Path {
        self.inner.location()
    }
}

/// A PDF with one Courier text line per page.
pub(crate) fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let kids: Vec<Object> = pages
        .iter()
        .map(|text| {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
