use egui::Color32;

/// Colors of highlighted groups; group `i` uses entry `i mod len`.
pub const GROUP_COLORS: [Color32; 7] = [
    Color32::from_rgb(0xfb, 0x92, 0x3c),
    Color32::from_rgb(0x08, 0x91, 0xb2),
    Color32::from_rgb(0x65, 0xa3, 0x0d),
    Color32::from_rgb(0xfb, 0x71, 0x85),
    Color32::from_rgb(0x93, 0x33, 0xea),
    Color32::from_rgb(0x64, 0x74, 0x8b),
    Color32::from_rgb(0x14, 0xb8, 0xa6),
];

pub const HIGHLIGHT: Color32 = GROUP_COLORS[0];
pub const VERTEX_BORDER: Color32 = Color32::from_rgb(0xa8, 0xa2, 0x9e);
pub const VERTEX_FILL: Color32 = Color32::from_rgb(0xfa, 0xfa, 0xf9);
pub const VERTEX_DRAG: Color32 = Color32::from_rgb(0x1c, 0x19, 0x17);
pub const EDGE: Color32 = Color32::from_rgb(0xd6, 0xd3, 0xd1);
pub const BAG_BORDER: Color32 = VERTEX_BORDER;
pub const BAG_FILL: Color32 = VERTEX_FILL;
pub const TEXT: Color32 = VERTEX_DRAG;

#[must_use]
pub const fn group_color(index: usize) -> Color32 {
    GROUP_COLORS[index % GROUP_COLORS.len()]
}
