use std::path::PathBuf;

use crate::catalog::{CatalogResult, SqliteCatalog};

#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub data_dir: PathBuf,
    pub catalog_path: PathBuf,
}

impl StoragePaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir: PathBuf = data_dir.into();
        let catalog_path = data_dir.join("clinics.sqlite");
        Self {
            data_dir,
            catalog_path,
        }
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }

    pub fn open_catalog(&self) -> CatalogResult<SqliteCatalog> {
        self.ensure_dirs()?;
        SqliteCatalog::open(&self.catalog_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogStore;

    #[test]
    fn open_catalog_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::new(dir.path().join("nested/data"));
        let catalog = paths.open_catalog().unwrap();
        assert_eq!(catalog.count().unwrap(), 0);
        assert!(paths.catalog_path.is_file());
    }
}
