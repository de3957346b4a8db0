// Fixed-stride byte grid shared by the height and fluid fields.
//
// Cells are stored row-major, each cell holding STRIDE u8 channels back to back.
// Coordinates outside the grid are a caller bug: every accessor asserts and panics
// instead of clamping.

/// Axis-aligned rectangle in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    // Exclusive right edge
    pub fn right(&self) -> usize {
        self.x + self.width
    }

    // Exclusive bottom edge
    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    // Grow by `by` cells on every side, clipped to a `width`×`height` domain
    pub fn expand_clipped(&self, by: usize, width: usize, height: usize) -> Rect {
        let x = self.x.saturating_sub(by);
        let y = self.y.saturating_sub(by);
        let right = (self.right() + by).min(width);
        let bottom = (self.bottom() + by).min(height);
        Rect::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }
}

/// One in-bounds member of a cell's 8-neighborhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub x: usize,
    pub y: usize,
    pub dx: i32,
    pub dy: i32,
}

impl Neighbor {
    pub fn is_diagonal(&self) -> bool {
        self.dx != 0 && self.dy != 0
    }
}

// Row-major scan order, so ties resolve the same way everywhere
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// In-bounds 8-neighbors of `(x, y)` on a `width`×`height` domain.
///
/// Neighbors past the edge are left out, so border cells have 5 and corners 3.
/// There is no wraparound.
pub fn neighbors8(
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> impl Iterator<Item = Neighbor> {
    NEIGHBOR_OFFSETS.into_iter().filter_map(move |(dx, dy)| {
        let nx = x.checked_add_signed(dx as isize)?;
        let ny = y.checked_add_signed(dy as isize)?;
        (nx < width && ny < height).then_some(Neighbor { x: nx, y: ny, dx, dy })
    })
}

/// Flat `width * height * STRIDE` byte buffer over a 2D domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid<const STRIDE: usize> {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl<const STRIDE: usize> Grid<STRIDE> {
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }

    pub fn with_size(width: usize, height: usize) -> Self {
        let mut grid = Self::new();
        grid.resize(width, height);
        grid
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        STRIDE
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Change the logical dimensions, keeping the overlapping top-left content.
    ///
    /// Returns the newly exposed rectangles (the bottom strip gained by growing
    /// taller, then the right strip gained by growing wider), zero-filled. The
    /// owner of the grid is expected to initialize them; preserved cells are never
    /// included. Nothing happens when the size is unchanged.
    pub fn resize(&mut self, width: usize, height: usize) -> Vec<Rect> {
        if width == self.width && height == self.height {
            return Vec::new();
        }

        let (old_width, old_height) = (self.width, self.height);
        let len = width * height * STRIDE;

        self.data = if old_width != width {
            // Row lengths differ: copy the shared prefix of every shared row
            let mut data = vec![0u8; len];
            let keep = old_width.min(width) * STRIDE;
            for y in 0..old_height.min(height) {
                let src = y * old_width * STRIDE;
                let dst = y * width * STRIDE;
                data[dst..dst + keep].copy_from_slice(&self.data[src..src + keep]);
            }
            data
        } else {
            // Same row length: growing appends zeroed rows, shrinking truncates
            let mut data = std::mem::take(&mut self.data);
            data.resize(len, 0);
            data
        };

        let mut exposed = Vec::with_capacity(2);
        if height > old_height {
            exposed.push(Rect::new(0, old_height, width, height - old_height));
        }
        if width > old_width {
            exposed.push(Rect::new(
                old_width,
                0,
                width - old_width,
                old_height.min(height),
            ));
        }
        exposed.retain(|r| !r.is_empty());

        self.width = width;
        self.height = height;
        exposed
    }

    /// Row-major linear index of `(x, y)`. Panics when out of range.
    #[inline]
    pub fn index_of(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "cell ({x}, {y}) outside {}x{} grid",
            self.width,
            self.height
        );
        y * self.width + x
    }

    #[inline]
    pub fn coords_of(&self, index: usize) -> (usize, usize) {
        assert!(
            index < self.cell_count(),
            "cell index {index} outside grid of {} cells",
            self.cell_count()
        );
        (index % self.width, index / self.width)
    }

    #[inline]
    fn offset(&self, index: usize, channel: usize) -> usize {
        assert!(
            index < self.cell_count(),
            "cell index {index} outside grid of {} cells",
            self.cell_count()
        );
        assert!(channel < STRIDE, "channel {channel} >= stride {STRIDE}");
        index * STRIDE + channel
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, channel: usize) -> u8 {
        self.get_by_index(self.index_of(x, y), channel)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, channel: usize, value: u8) {
        let index = self.index_of(x, y);
        self.set_by_index(index, channel, value);
    }

    #[inline]
    pub fn get_by_index(&self, index: usize, channel: usize) -> u8 {
        self.data[self.offset(index, channel)]
    }

    #[inline]
    pub fn set_by_index(&mut self, index: usize, channel: usize, value: u8) {
        let offset = self.offset(index, channel);
        self.data[offset] = value;
    }

    /// Saturating add on one channel. Returns the delta actually applied, which
    /// is smaller than `delta` in magnitude when the value hits 0 or 255.
    pub fn incr(&mut self, x: usize, y: usize, channel: usize, delta: i32) -> i32 {
        let index = self.index_of(x, y);
        self.incr_by_index(index, channel, delta)
    }

    pub fn incr_by_index(&mut self, index: usize, channel: usize, delta: i32) -> i32 {
        let offset = self.offset(index, channel);
        let old = i32::from(self.data[offset]);
        let new = old.saturating_add(delta).clamp(0, i32::from(u8::MAX));
        self.data[offset] = new as u8;
        new - old
    }

    /// Values of one channel in row-major cell order.
    pub fn channel(&self, channel: usize) -> impl Iterator<Item = u8> + '_ {
        assert!(channel < STRIDE, "channel {channel} >= stride {STRIDE}");
        self.data.iter().skip(channel).step_by(STRIDE).copied()
    }

    pub fn fill_channel(&mut self, channel: usize, value: u8) {
        assert!(channel < STRIDE, "channel {channel} >= stride {STRIDE}");
        for cell in self.data.chunks_exact_mut(STRIDE) {
            cell[channel] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Grid, Rect, neighbors8};

    fn pattern(x: usize, y: usize, c: usize) -> u8 {
        ((x * 31 + y * 17 + c * 7) % 251) as u8
    }

    #[test]
    fn grid_first_resize_exposes_everything() {
        let mut g: Grid<3> = Grid::new();
        let rects = g.resize(4, 3);
        assert_eq!(rects, vec![Rect::new(0, 0, 4, 3)]);
        assert_eq!(g.as_bytes().len(), 4 * 3 * 3);
    }

    #[test]
    fn grid_resize_same_size_is_noop() {
        let mut g: Grid<2> = Grid::with_size(5, 5);
        g.set(2, 2, 1, 9);
        assert!(g.resize(5, 5).is_empty());
        assert_eq!(g.get(2, 2, 1), 9);
    }

    #[test]
    fn grid_grow_both_reports_bottom_then_right_strip() {
        let mut g: Grid<1> = Grid::with_size(3, 2);
        let rects = g.resize(5, 4);
        assert_eq!(rects, vec![Rect::new(0, 2, 5, 2), Rect::new(3, 0, 2, 2)]);
    }

    #[test]
    fn grid_grow_height_only_keeps_prefix() {
        let mut g: Grid<2> = Grid::with_size(3, 2);
        for y in 0..2 {
            for x in 0..3 {
                g.set(x, y, 0, pattern(x, y, 0));
                g.set(x, y, 1, pattern(x, y, 1));
            }
        }
        let rects = g.resize(3, 4);
        assert_eq!(rects, vec![Rect::new(0, 2, 3, 2)]);
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(g.get(x, y, 0), pattern(x, y, 0));
                assert_eq!(g.get(x, y, 1), pattern(x, y, 1));
            }
        }
        assert_eq!(g.get(1, 3, 0), 0);
    }

    #[test]
    fn grid_shrink_width_crops_rows() {
        let mut g: Grid<1> = Grid::with_size(4, 3);
        for y in 0..3 {
            for x in 0..4 {
                g.set(x, y, 0, pattern(x, y, 0));
            }
        }
        assert!(g.resize(2, 3).is_empty());
        assert_eq!(g.as_bytes().len(), 6);
        for y in 0..3 {
            for x in 0..2 {
                assert_eq!(g.get(x, y, 0), pattern(x, y, 0));
            }
        }
    }

    #[test]
    fn grid_incr_saturates_and_reports_actual_delta() {
        let mut g: Grid<3> = Grid::with_size(2, 2);
        g.set(1, 1, 0, 250);
        assert_eq!(g.incr(1, 1, 0, 10), 5);
        assert_eq!(g.get(1, 1, 0), 255);
        assert_eq!(g.incr(1, 1, 0, -300), -255);
        assert_eq!(g.get(1, 1, 0), 0);
        assert_eq!(g.incr(1, 1, 0, i32::MIN), 0);
    }

    #[test]
    fn grid_index_and_coords_agree() {
        let g: Grid<3> = Grid::with_size(7, 5);
        let i = g.index_of(3, 4);
        assert_eq!(i, 31);
        assert_eq!(g.coords_of(i), (3, 4));
    }

    #[test]
    fn grid_channel_iter_and_fill() {
        let mut g: Grid<3> = Grid::with_size(2, 2);
        g.fill_channel(1, 128);
        g.set(0, 1, 0, 4);
        assert_eq!(g.channel(1).collect::<Vec<_>>(), vec![128; 4]);
        assert_eq!(g.channel(0).collect::<Vec<_>>(), vec![0, 0, 4, 0]);
    }

    #[test]
    #[should_panic]
    fn grid_out_of_range_panics() {
        let g: Grid<3> = Grid::with_size(4, 4);
        let _ = g.get(4, 0, 0);
    }

    #[test]
    #[should_panic]
    fn grid_bad_channel_panics() {
        let mut g: Grid<3> = Grid::with_size(4, 4);
        g.set(0, 0, 3, 1);
    }

    #[test]
    fn neighbors_omit_out_of_range_cells() {
        assert_eq!(neighbors8(0, 0, 4, 4).count(), 3);
        assert_eq!(neighbors8(2, 0, 4, 4).count(), 5);
        assert_eq!(neighbors8(1, 1, 4, 4).count(), 8);
        assert_eq!(neighbors8(0, 0, 1, 1).count(), 0);
        let diag = neighbors8(1, 1, 3, 3).filter(|n| n.is_diagonal()).count();
        assert_eq!(diag, 4);
    }

    #[test]
    fn rect_expand_is_clipped() {
        let r = Rect::new(0, 2, 3, 2).expand_clipped(1, 4, 4);
        assert_eq!(r, Rect::new(0, 1, 4, 3));
    }
}
