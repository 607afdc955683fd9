pub mod books;

use std::sync::Arc;

use bookstore_kernel::ModuleRegistry;

use books::store::BookStore;

/// Register all service modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, store: Arc<dyn BookStore>) -> anyhow::Result<()> {
    registry.register(books::create_module(store)?);
    Ok(())
}
