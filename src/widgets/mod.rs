//! Built-in classes: `component.Base` and `menu.List`.

pub mod component;
pub mod menu;

pub use menu::{MeasureRequest, MeasuredItem, MenuItem, MenuList, Selection};

use crate::error::Result;
use crate::runtime::Runtime;

/// Register every built-in class on `rt`, ancestors first.
pub fn define(rt: &mut Runtime) -> Result<()> {
    rt.try_apply_class_config(component::definition())?;
    rt.try_apply_class_config(menu::definition())?;
    Ok(())
}
