// This file is part of cia64.
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

#[macro_use]
extern crate log;

mod factory;
pub mod io;
pub mod util;

pub use crate::factory::Chip;
