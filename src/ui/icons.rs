//! Emoji used by the login UI, with plain-text fallbacks for dumb terminals.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static LOCK: Emoji<'_, '_> = Emoji("🔐 ", "[>]");
pub static SWAP: Emoji<'_, '_> = Emoji("🔄 ", "[~]");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
pub static ARROW: Emoji<'_, '_> = Emoji("➡️  ", "->");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");
