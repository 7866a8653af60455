//! In-memory book store with optimistic versioning.
//!
//! Books are held as `Arc<Book>` snapshots. Replacing a book's pages builds a new
//! book value and swaps it in as one step, so a failed replacement leaves the
//! previous pages untouched and an export holding an older snapshot keeps
//! rendering the pages it started with.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Book, BookInput, PageInput};
use crate::{Error, Result};

/// Versioned collection of books keyed by id.
#[derive(Debug, Default)]
pub struct BookStore {
    books: HashMap<String, Arc<Book>>,
}

impl BookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a book. Title and author are required.
    pub fn create(&mut self, input: BookInput) -> Result<Arc<Book>> {
        if input
            .author_name
            .as_deref()
            .map(str::trim)
            .is_none_or(str::is_empty)
        {
            return Err(Error::Validation("Book author is required".to_string()));
        }
        let book = Book::from_input(input)?;
        if self.books.contains_key(&book.id) {
            return Err(Error::Validation(format!(
                "Book already exists: {}",
                book.id
            )));
        }
        let book = Arc::new(book);
        self.books.insert(book.id.clone(), Arc::clone(&book));
        tracing::info!(book_id = %book.id, pages = book.total_pages, "created book");
        Ok(book)
    }

    /// Snapshot of a book.
    pub fn get(&self, id: &str) -> Result<Arc<Book>> {
        self.books
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("book {}", id)))
    }

    /// Replace every page of a book in one copy-on-write step.
    ///
    /// `expected_version` must match the stored version; otherwise the call fails
    /// with [`Error::VersionConflict`] and nothing changes.
    pub fn replace_pages(
        &mut self,
        id: &str,
        expected_version: u64,
        pages: Vec<PageInput>,
    ) -> Result<Arc<Book>> {
        let current = self.get(id)?;
        if current.version != expected_version {
            return Err(Error::VersionConflict {
                expected: expected_version,
                actual: current.version,
            });
        }
        if pages.is_empty() {
            return Err(Error::Validation(
                "Book must contain at least one page".to_string(),
            ));
        }

        let mut next = (*current).clone();
        next.pages = current.build_pages(pages)?;
        next.total_pages = next.pages.len() as u32;
        next.version = current.version + 1;

        let next = Arc::new(next);
        self.books.insert(id.to_string(), Arc::clone(&next));
        tracing::info!(
            book_id = id,
            version = next.version,
            pages = next.total_pages,
            "replaced pages"
        );
        Ok(next)
    }

    /// Remove a book and, with it, all of its pages.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.books
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("book {}", id)))
    }

    /// Ids of all stored books, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.books.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}
