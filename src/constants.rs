pub const TOTAL_RAM: usize = 0x1000;
pub const ADDRESS_MASK: u16 = 0x0FFF;
pub const INSTRUCTIONS_PER_SECOND: u32 = 700;
pub const TIMER_HZ: u32 = 60;
pub const MEMORY_OFFSET: usize = 0x200;
pub const AVAILABLE_RAM: usize = TOTAL_RAM - MEMORY_OFFSET;
pub const FONT_OFFSET: usize = 0x000;
pub const FONT_GLYPH_SIZE: usize = 5;
pub const FONT_RANGE: (usize, usize) = (FONT_OFFSET, FONT_OFFSET + 16 * FONT_GLYPH_SIZE);
pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const STACK_DEPTH: usize = 16;
pub const REGISTER_COUNT: usize = 16;
pub const KEY_COUNT: usize = 16;
pub const FLAG_REGISTER: u8 = 0xF;
