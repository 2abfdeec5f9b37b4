use refmark_core::GrayImage;

/// 6x6 marker with a black ring and an inner pattern that differs under
/// every quarter turn. `#` is black, `.` is white.
pub(crate) const REFERENCE_PATTERN: [&str; 6] = [
    "######", //
    "#..#.#", //
    "#.##.#", //
    "#....#", //
    "##.#.#", //
    "######",
];

pub(crate) fn draw_modules(rows: &[&str], module_px: usize) -> GrayImage {
    let side = rows.len();
    let mut img = GrayImage::new_fill(side * module_px, side * module_px, 255);
    for (r, row) in rows.iter().enumerate() {
        for (c, ch) in row.chars().enumerate() {
            if ch != '#' {
                continue;
            }
            for y in r * module_px..(r + 1) * module_px {
                for x in c * module_px..(c + 1) * module_px {
                    img.set_pixel(x, y, 0);
                }
            }
        }
    }
    img
}

pub(crate) fn paste(canvas: &mut GrayImage, img: &GrayImage, x0: usize, y0: usize) {
    for y in 0..img.height {
        for x in 0..img.width {
            canvas.set_pixel(x0 + x, y0 + y, img.pixel(x, y));
        }
    }
}
