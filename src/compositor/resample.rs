/// Nearest-neighbour index map from output pixels to source pixels.
///
/// Output column `x` samples source column `floor(x * src_w / dst_w)`, and the
/// same for rows. One map is shared by the base image and every mask, so
/// layer edges line up with the photo at any output size. For integer upscales
/// each source pixel covers an exact `k x k` block.
#[derive(Debug, Clone)]
pub struct NearestMap {
    columns: Vec<u32>,
    rows: Vec<u32>,
}

impl NearestMap {
    pub fn new(source: (u32, u32), output: (u32, u32)) -> Self {
        Self {
            columns: axis(source.0, output.0),
            rows: axis(source.1, output.1),
        }
    }

    /// Source pixel sampled for output pixel `(x, y)`, without building a map.
    pub fn source_of(source: (u32, u32), output: (u32, u32), x: u32, y: u32) -> (u32, u32) {
        (nearest(source.0, output.0, x), nearest(source.1, output.1, y))
    }

    pub fn output_size(&self) -> (u32, u32) {
        (self.columns.len() as u32, self.rows.len() as u32)
    }

    /// Row-major `(output_index, source_x, source_y)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32, u32)> + '_ {
        let width = self.columns.len();
        self.rows.iter().enumerate().flat_map(move |(oy, &sy)| {
            self.columns
                .iter()
                .enumerate()
                .map(move |(ox, &sx)| (oy * width + ox, sx, sy))
        })
    }
}

fn axis(source: u32, output: u32) -> Vec<u32> {
    (0..output).map(|o| nearest(source, output, o)).collect()
}

fn nearest(source: u32, output: u32, o: u32) -> u32 {
    (o as u64 * source as u64 / output as u64) as u32
}
