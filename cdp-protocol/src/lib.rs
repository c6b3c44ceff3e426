//! A hand-written slice of the Chrome DevTools Protocol: only the commands
//! and events `pdfcdp` actually drives. Full protocol coverage generated
//! from Chromium's `.pdl` files is out of scope — see `DESIGN.md`.

pub mod dom;
pub mod network;
pub mod page;
</content>
