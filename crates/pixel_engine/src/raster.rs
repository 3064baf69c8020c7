//! Filled shape rasterization into a [`FrameBufferView`]
//!
//! Coordinates are signed so shapes may hang off any edge of the view; every
//! function clips to the view and never touches memory outside it.

use crate::present::FrameBufferView;

/// Fill `[x0, x1]` on row `y`, clipped to the view
fn fill_span(view: &mut FrameBufferView<'_>, y: i64, x0: i64, x1: i64, color: u32) {
    if y < 0 || y >= i64::from(view.height()) {
        return;
    }
    let start = x0.max(0);
    let end = x1.min(i64::from(view.width()) - 1);
    if start > end {
        return;
    }
    view.row_mut(y as u32)[start as usize..=end as usize].fill(color);
}

/// Fill the `width x height` rectangle whose top-left corner is `(x, y)`
///
/// Empty or negative extents draw nothing.
pub fn fill_rect(view: &mut FrameBufferView<'_>, x: i32, y: i32, width: i32, height: i32, color: u32) {
    if width <= 0 || height <= 0 {
        return;
    }
    let (x, y) = (i64::from(x), i64::from(y));
    let top = y.max(0);
    let bottom = (y + i64::from(height)).min(i64::from(view.height()));
    for row in top..bottom {
        fill_span(view, row, x, x + i64::from(width) - 1, color);
    }
}

/// Fill the disc of `radius` around `(cx, cy)` by testing every point of its
/// bounding square against `dx² + dy² <= r²`
pub fn fill_circle_simple(view: &mut FrameBufferView<'_>, cx: i32, cy: i32, radius: i32, color: u32) {
    if radius < 0 {
        return;
    }
    let (cx, cy, r) = (i64::from(cx), i64::from(cy), i64::from(radius));
    let (width, height) = (i64::from(view.width()), i64::from(view.height()));

    for dy in -r..=r {
        let y = cy + dy;
        if y < 0 || y >= height {
            continue;
        }
        for dx in -r..=r {
            let x = cx + dx;
            if x >= 0 && x < width && dx * dx + dy * dy <= r * r {
                view.set_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Fill the disc of `radius` around `(cx, cy)` with the midpoint (Bresenham)
/// circle algorithm
///
/// Walks one octant of the outline and fills the horizontal spans between
/// its mirror images, so each row costs one span fill instead of a per-pixel
/// distance test.
pub fn fill_circle_bresenham(view: &mut FrameBufferView<'_>, cx: i32, cy: i32, radius: i32, color: u32) {
    if radius < 0 {
        return;
    }
    let (cx, cy) = (i64::from(cx), i64::from(cy));
    let mut x = 0i64;
    let mut y = i64::from(radius);
    let mut d = 3 - 2 * y;

    while y >= x {
        fill_span(view, cy + y, cx - x, cx + x, color);
        fill_span(view, cy - y, cx - x, cx + x, color);
        fill_span(view, cy + x, cx - y, cx + y, color);
        fill_span(view, cy - x, cx - y, cx + y, color);

        x += 1;
        if d > 0 {
            y -= 1;
            d += 4 * (x - y) + 10;
        } else {
            d += 4 * x + 6;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLOR: u32 = 0x00FF_5733;

    struct Canvas {
        words: Vec<u32>,
        stride_words: usize,
        width: u32,
        height: u32,
    }

    impl Canvas {
        /// Rows padded by 3 pixels of sentinel
        fn new(width: u32, height: u32) -> Self {
            let stride_words = width as usize + 3;
            Self {
                words: vec![0xDEAD_BEEF; stride_words * height as usize],
                stride_words,
                width,
                height,
            }
        }

        fn draw(&mut self, f: impl FnOnce(&mut FrameBufferView<'_>)) {
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words);
            let mut view = FrameBufferView::new(bytes, self.stride_words * 4, self.width, self.height)
                .expect("valid geometry");
            view.clear(0);
            f(&mut view);
        }

        fn at(&self, x: u32, y: u32) -> u32 {
            self.words[y as usize * self.stride_words + x as usize]
        }

        fn count(&self, color: u32) -> usize {
            (0..self.height)
                .flat_map(|y| (0..self.width).map(move |x| (x, y)))
                .filter(|&(x, y)| self.at(x, y) == color)
                .count()
        }

        fn padding_intact(&self) -> bool {
            self.words
                .chunks(self.stride_words)
                .all(|row| row[self.width as usize..].iter().all(|&w| w == 0xDEAD_BEEF))
        }
    }

    #[test]
    fn test_fill_rect_inside() {
        let mut canvas = Canvas::new(10, 10);
        canvas.draw(|view| fill_rect(view, 2, 3, 4, 2, COLOR));

        assert_eq!(canvas.count(COLOR), 8);
        assert_eq!(canvas.at(2, 3), COLOR);
        assert_eq!(canvas.at(5, 4), COLOR);
        assert_eq!(canvas.at(6, 4), 0);
        assert_eq!(canvas.at(2, 5), 0);
    }

    #[test]
    fn test_fill_rect_clips_to_view() {
        let mut canvas = Canvas::new(8, 6);
        canvas.draw(|view| fill_rect(view, -2, -2, 4, 4, COLOR));
        assert_eq!(canvas.count(COLOR), 4);

        canvas.draw(|view| fill_rect(view, 6, 4, 100, 100, COLOR));
        assert_eq!(canvas.count(COLOR), 4);
        assert!(canvas.padding_intact());

        canvas.draw(|view| fill_rect(view, i32::MAX, i32::MAX, i32::MAX, i32::MAX, COLOR));
        assert_eq!(canvas.count(COLOR), 0);
    }

    #[test]
    fn test_fill_rect_empty_extent() {
        let mut canvas = Canvas::new(4, 4);
        canvas.draw(|view| {
            fill_rect(view, 1, 1, 0, 3, COLOR);
            fill_rect(view, 1, 1, 3, -1, COLOR);
        });
        assert_eq!(canvas.count(COLOR), 0);
    }

    #[test]
    fn test_circle_simple_degenerate_radius() {
        let mut canvas = Canvas::new(5, 5);
        canvas.draw(|view| fill_circle_simple(view, 2, 2, 0, COLOR));
        assert_eq!(canvas.count(COLOR), 1);
        assert_eq!(canvas.at(2, 2), COLOR);

        canvas.draw(|view| fill_circle_simple(view, 2, 2, -4, COLOR));
        assert_eq!(canvas.count(COLOR), 0);
    }

    #[test]
    fn test_circle_simple_small_disc() {
        let mut canvas = Canvas::new(9, 9);
        canvas.draw(|view| fill_circle_simple(view, 4, 4, 2, COLOR));
        // rows of 1, 3, 5, 3, 1 pixels
        assert_eq!(canvas.count(COLOR), 13);
        assert_eq!(canvas.at(6, 4), COLOR);
        assert_eq!(canvas.at(6, 5), 0);
    }

    #[test]
    fn test_circle_simple_clips_at_corner() {
        let mut canvas = Canvas::new(8, 8);
        canvas.draw(|view| fill_circle_simple(view, 0, 0, 3, COLOR));
        // the quarter disc with x, y >= 0
        assert_eq!(canvas.count(COLOR), 11);
        assert!(canvas.padding_intact());

        canvas.draw(|view| fill_circle_simple(view, -50, 4, 10, COLOR));
        assert_eq!(canvas.count(COLOR), 0);
    }

    #[test]
    fn test_circle_simple_scene() {
        let mut canvas = Canvas::new(400, 400);
        canvas.draw(|view| fill_circle_simple(view, 200, 200, 100, COLOR));

        assert_eq!(canvas.at(200, 200), COLOR);
        assert_eq!(canvas.at(300, 200), COLOR);
        assert_eq!(canvas.at(200, 100), COLOR);
        assert_eq!(canvas.at(301, 200), 0);
        assert_eq!(canvas.at(271, 271), 0);
        assert_eq!(canvas.count(COLOR), 31417);
    }

    #[test]
    fn test_circle_bresenham_degenerate_radius() {
        let mut canvas = Canvas::new(5, 5);
        canvas.draw(|view| fill_circle_bresenham(view, 2, 2, 0, COLOR));
        assert_eq!(canvas.count(COLOR), 1);
        assert_eq!(canvas.at(2, 2), COLOR);

        canvas.draw(|view| fill_circle_bresenham(view, 2, 2, -1, COLOR));
        assert_eq!(canvas.count(COLOR), 0);
    }

    #[test]
    fn test_circle_bresenham_radius_one_is_a_plus() {
        let mut canvas = Canvas::new(3, 3);
        canvas.draw(|view| fill_circle_bresenham(view, 1, 1, 1, COLOR));
        assert_eq!(canvas.count(COLOR), 5);
        assert_eq!(canvas.at(0, 0), 0);
        assert_eq!(canvas.at(1, 0), COLOR);
    }

    #[test]
    fn test_circle_bresenham_is_symmetric_and_solid() {
        let mut canvas = Canvas::new(41, 41);
        canvas.draw(|view| fill_circle_bresenham(view, 20, 20, 15, COLOR));

        for y in 0..41 {
            let row: Vec<u32> = (0..41).filter(|&x| canvas.at(x, y) == COLOR).collect();
            assert_eq!(row.len(), (0..41).filter(|&x| canvas.at(x, 40 - y) == COLOR).count());
            if let (Some(&first), Some(&last)) = (row.first(), row.last()) {
                assert_eq!(first + last, 40, "row {y} is not centred");
                assert_eq!(row.len() as u32, last - first + 1, "row {y} has a gap");
            }
        }
        assert_eq!(canvas.at(35, 20), COLOR);
        assert_eq!(canvas.at(20, 5), COLOR);
        assert_eq!(canvas.at(36, 20), 0);
    }

    #[test]
    fn test_circle_bresenham_area_close_to_disc() {
        let mut canvas = Canvas::new(400, 400);
        canvas.draw(|view| fill_circle_bresenham(view, 200, 200, 100, COLOR));

        let area = canvas.count(COLOR) as f64;
        let expected = std::f64::consts::PI * 100.0 * 100.0;
        assert!((area - expected).abs() / expected < 0.03, "area {area}");
        assert!(canvas.padding_intact());
    }

    #[test]
    fn test_circle_bresenham_clips() {
        let mut canvas = Canvas::new(10, 10);
        canvas.draw(|view| fill_circle_bresenham(view, 9, 9, 30, COLOR));
        assert_eq!(canvas.count(COLOR), 100);
        assert!(canvas.padding_intact());
    }
}
