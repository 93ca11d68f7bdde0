//! CSV export of inventory rows

use crate::api::Product;
use chrono::Utc;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CSV_HEADER: [&str; 7] = ["id", "name", "sku", "category", "price", "stock", "status"];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export")]
    Empty,

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Write products as CSV to any writer
pub fn write_products<W: io::Write>(writer: W, products: &[&Product]) -> Result<(), ExportError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;
    for product in products {
        let price = format!("{:.2}", product.price);
        let stock = product.stock.to_string();
        csv.write_record([
            product.id.as_str(),
            product.name.as_str(),
            product.sku.as_str(),
            product.category.as_str(),
            price.as_str(),
            stock.as_str(),
            product.status.as_str(),
        ])?;
    }
    csv.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Export to a timestamped file in `dir` and return its path
pub fn export_to_dir(dir: &Path, products: &[&Product]) -> Result<PathBuf, ExportError> {
    if products.is_empty() {
        return Err(ExportError::Empty);
    }
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let stamp = Utc::now().format("%Y%m%d-%H%M%S").to_string();
    let (path, file) = create_unique(dir, &stamp)?;
    write_products(file, products)?;
    tracing::info!(path = %path.display(), rows = products.len(), "inventory exported");
    Ok(path)
}

/// Create `inventory-<stamp>.csv`, adding `-2`, `-3`, ... when the name is taken
fn create_unique(dir: &Path, stamp: &str) -> Result<(PathBuf, File), ExportError> {
    let mut attempt = 1;
    loop {
        let name = if attempt == 1 {
            format!("inventory-{stamp}.csv")
        } else {
            format!("inventory-{stamp}-{attempt}.csv")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(ExportError::Io { path, source }),
        }
    }
}
