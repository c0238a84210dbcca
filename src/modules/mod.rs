pub mod catalog;

use catalog_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry) -> anyhow::Result<()> {
    registry.register(catalog::create_module())?;
    Ok(())
}
