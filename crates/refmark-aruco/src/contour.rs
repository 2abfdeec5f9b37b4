//! Outer contours of binary blobs and polygon helpers.
//!
//! Foreground is any non-zero pixel, connected with 8-neighbourhood;
//! background is 4-connected. Only blobs reachable from the frame's
//! surrounding background are traced, so anything sitting inside another
//! blob's hole is skipped.

use nalgebra::Point2;
use refmark_core::GrayImage;
use std::collections::VecDeque;

/// Neighbour offsets, counter-clockwise on screen starting east.
const NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];
const WEST: usize = 4;

struct Binary<'a> {
    img: &'a GrayImage,
}

impl Binary<'_> {
    #[inline]
    fn is_set(&self, x: i32, y: i32) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.img.width
            && (y as usize) < self.img.height
            && self.img.pixel(x as usize, y as usize) != 0
    }
}

/// Outer boundaries of all top-level blobs, in raster order of their first pixel.
///
/// Boundaries are chain-compressed: interior points of straight
/// horizontal, vertical or diagonal runs are dropped.
pub(crate) fn find_external_contours(binary: &GrayImage) -> Vec<Vec<Point2<i32>>> {
    let (w, h) = (binary.width, binary.height);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let fg = |idx: usize| binary.data[idx] != 0;

    // 8-connected blob labels; 0 = background
    let mut labels = vec![0u32; w * h];
    let mut starts: Vec<(i32, i32)> = Vec::new();
    let mut queue = VecDeque::new();
    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if !fg(idx) || labels[idx] != 0 {
                continue;
            }
            starts.push((x as i32, y as i32));
            let label = starts.len() as u32;
            labels[idx] = label;
            queue.push_back((x, y));
            while let Some((cx, cy)) = queue.pop_front() {
                for (dx, dy) in NEIGHBORS {
                    let nx = cx as i32 + dx;
                    let ny = cy as i32 + dy;
                    if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                        continue;
                    }
                    let nidx = ny as usize * w + nx as usize;
                    if fg(nidx) && labels[nidx] == 0 {
                        labels[nidx] = label;
                        queue.push_back((nx as usize, ny as usize));
                    }
                }
            }
        }
    }
    if starts.is_empty() {
        return Vec::new();
    }

    // 4-connected background reachable from outside the frame
    let mut outside = vec![false; w * h];
    for y in 0..h {
        for x in 0..w {
            let on_edge = x == 0 || y == 0 || x + 1 == w || y + 1 == h;
            let idx = y * w + x;
            if on_edge && !fg(idx) && !outside[idx] {
                outside[idx] = true;
                queue.push_back((x, y));
            }
        }
    }
    while let Some((cx, cy)) = queue.pop_front() {
        for (dx, dy) in [(1i32, 0i32), (-1, 0), (0, 1), (0, -1)] {
            let nx = cx as i32 + dx;
            let ny = cy as i32 + dy;
            if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                continue;
            }
            let nidx = ny as usize * w + nx as usize;
            if !fg(nidx) && !outside[nidx] {
                outside[nidx] = true;
                queue.push_back((nx as usize, ny as usize));
            }
        }
    }

    let mut top_level = vec![false; starts.len() + 1];
    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let label = labels[idx] as usize;
            if label == 0 || top_level[label] {
                continue;
            }
            let on_edge = x == 0 || y == 0 || x + 1 == w || y + 1 == h;
            let touches_outside = on_edge
                || outside[idx - 1]
                || outside[idx + 1]
                || outside[idx - w]
                || outside[idx + w];
            if touches_outside {
                top_level[label] = true;
            }
        }
    }

    let bin = Binary { img: binary };
    starts
        .iter()
        .enumerate()
        .filter(|(i, _)| top_level[i + 1])
        .map(|(_, &start)| compress_chain(&trace_outer_border(&bin, start)))
        .collect()
}

#[inline]
fn direction(from: (i32, i32), to: (i32, i32)) -> usize {
    let d = (to.0 - from.0, to.1 - from.1);
    NEIGHBORS.iter().position(|&n| n == d).unwrap_or(WEST)
}

/// Suzuki–Abe border following from a pixel whose west neighbour is background.
fn trace_outer_border(bin: &Binary<'_>, start: (i32, i32)) -> Vec<(i32, i32)> {
    let step = |p: (i32, i32), k: usize| (p.0 + NEIGHBORS[k].0, p.1 + NEIGHBORS[k].1);

    // predecessor: first foreground neighbour clockwise from west
    let last = (0..8)
        .map(|s| (WEST + 8 - s) % 8)
        .map(|k| step(start, k))
        .find(|&q| bin.is_set(q.0, q.1));
    let Some(last) = last else {
        return vec![start];
    };

    let mut out = vec![start];
    let (mut prev, mut cur) = (last, start);
    loop {
        let back = direction(cur, prev);
        // always terminates at `prev` itself, which is foreground
        let next = (1..=8)
            .map(|s| step(cur, (back + s) % 8))
            .find(|&q| bin.is_set(q.0, q.1))
            .unwrap_or(prev);
        if next == start && cur == last {
            break;
        }
        out.push(next);
        prev = cur;
        cur = next;
    }
    out
}

fn compress_chain(chain: &[(i32, i32)]) -> Vec<Point2<i32>> {
    let n = chain.len();
    if n < 3 {
        return chain.iter().map(|&(x, y)| Point2::new(x, y)).collect();
    }
    (0..n)
        .filter(|&i| {
            let a = chain[(i + n - 1) % n];
            let b = chain[i];
            let c = chain[(i + 1) % n];
            (b.0 - a.0, b.1 - a.1) != (c.0 - b.0, c.1 - b.1)
        })
        .map(|i| Point2::new(chain[i].0, chain[i].1))
        .collect()
}

/// Perimeter of a closed polygon.
pub(crate) fn arc_length(poly: &[Point2<f64>]) -> f64 {
    let n = poly.len();
    if n < 2 {
        return 0.0;
    }
    (0..n).map(|i| (poly[(i + 1) % n] - poly[i]).norm()).sum()
}

/// Shoelace signed area; positive when the vertices turn clockwise on screen.
pub(crate) fn signed_area(poly: &[Point2<f64>]) -> f64 {
    let n = poly.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let (a, b) = (poly[i], poly[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum();
    0.5 * twice
}

pub(crate) fn is_convex(poly: &[Point2<f64>]) -> bool {
    let n = poly.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0_f64;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        let c = poly[(i + 2) % n];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}

/// Douglas–Peucker simplification of a closed curve.
///
/// The curve is split at two mutually distant points and each half is
/// simplified independently; vertex order is preserved.
pub(crate) fn approx_poly_closed(points: &[Point2<f64>], epsilon: f64) -> Vec<Point2<f64>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let farthest_from = |i: usize| {
        (0..n)
            .max_by(|&a, &b| {
                let da = (points[a] - points[i]).norm_squared();
                let db = (points[b] - points[i]).norm_squared();
                da.total_cmp(&db)
            })
            .unwrap_or(i)
    };
    let a = farthest_from(farthest_from(0));
    let b = farthest_from(a);

    // rotate so the split point leads, and close the loop
    let ring: Vec<Point2<f64>> = (0..=n).map(|i| points[(a + i) % n]).collect();
    let mid = (b + n - a) % n;
    let mut keep = vec![false; n + 1];
    keep[0] = true;
    keep[mid] = true;
    simplify_open(&ring, 0, mid, epsilon, &mut keep);
    simplify_open(&ring, mid, n, epsilon, &mut keep);

    (0..n).filter(|&i| keep[i]).map(|i| ring[i]).collect()
}

fn simplify_open(ring: &[Point2<f64>], first: usize, last: usize, eps: f64, keep: &mut [bool]) {
    let mut stack = vec![(first, last)];
    while let Some((i, j)) = stack.pop() {
        if j <= i + 1 {
            continue;
        }
        let (p, q) = (ring[i], ring[j]);
        let d = q - p;
        let len = d.norm();
        let (mut best, mut best_dist) = (i, -1.0_f64);
        for (k, r) in ring.iter().enumerate().take(j).skip(i + 1) {
            let dist = if len > 0.0 {
                (d.x * (r.y - p.y) - d.y * (r.x - p.x)).abs() / len
            } else {
                (r - p).norm()
            };
            if dist > best_dist {
                best = k;
                best_dist = dist;
            }
        }
        if best_dist > eps {
            keep[best] = true;
            stack.push((i, best));
            stack.push((best, j));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_rect(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> GrayImage {
        let mut img = GrayImage::new_fill(w, h, 0);
        for y in y0..y1 {
            for x in x0..x1 {
                img.set_pixel(x, y, 255);
            }
        }
        img
    }

    fn as_f64(c: &[Point2<i32>]) -> Vec<Point2<f64>> {
        c.iter().map(|p| Point2::new(p.x as f64, p.y as f64)).collect()
    }

    #[test]
    fn rectangle_outline_compresses_to_corners() {
        let img = filled_rect(20, 20, 3, 4, 15, 12);
        let contours = find_external_contours(&img);
        assert_eq!(contours.len(), 1);
        let mut corners = contours[0].clone();
        corners.sort_by_key(|p| (p.y, p.x));
        assert_eq!(
            corners,
            vec![
                Point2::new(3, 4),
                Point2::new(14, 4),
                Point2::new(3, 11),
                Point2::new(14, 11),
            ]
        );
    }

    #[test]
    fn blob_inside_a_hole_is_not_external() {
        // ring with a dot in the middle
        let mut img = filled_rect(30, 30, 5, 5, 25, 25);
        for y in 8..22 {
            for x in 8..22 {
                img.set_pixel(x, y, 0);
            }
        }
        img.set_pixel(15, 15, 255);
        let contours = find_external_contours(&img);
        assert_eq!(contours.len(), 1);
        assert!(contours[0].iter().all(|p| p.x == 5 || p.x == 24 || p.y == 5 || p.y == 24));
    }

    #[test]
    fn separate_blobs_come_out_in_raster_order() {
        let mut img = filled_rect(40, 20, 25, 2, 35, 8);
        for y in 10..16 {
            for x in 2..10 {
                img.set_pixel(x, y, 255);
            }
        }
        let contours = find_external_contours(&img);
        assert_eq!(contours.len(), 2);
        assert!(contours[0].iter().all(|p| p.x >= 25));
        assert!(contours[1].iter().all(|p| p.x < 10));
    }

    #[test]
    fn single_pixel_blob_yields_one_point() {
        let mut img = GrayImage::new_fill(5, 5, 0);
        img.set_pixel(2, 2, 255);
        assert_eq!(find_external_contours(&img), vec![vec![Point2::new(2, 2)]]);
    }

    #[test]
    fn simplification_keeps_square_corners() {
        // dense square outline with a small bump on one edge
        let mut pts = Vec::new();
        for i in 0..40 {
            pts.push(Point2::new(i as f64, 0.0));
        }
        for i in 0..40 {
            pts.push(Point2::new(40.0, i as f64 + if i == 20 { 0.5 } else { 0.0 }));
        }
        for i in 0..40 {
            pts.push(Point2::new(40.0 - i as f64, 40.0));
        }
        for i in 0..40 {
            pts.push(Point2::new(0.0, 40.0 - i as f64));
        }
        let eps = 0.05 * arc_length(&pts);
        let poly = approx_poly_closed(&pts, eps);
        assert_eq!(poly.len(), 4);
        assert!(is_convex(&poly));
        approx::assert_relative_eq!(signed_area(&poly).abs(), 1600.0);
    }

    #[test]
    fn concave_polygon_is_detected() {
        let dart = as_f64(&[
            Point2::new(0, 0),
            Point2::new(10, 5),
            Point2::new(20, 0),
            Point2::new(10, 20),
        ]);
        assert!(!is_convex(&dart));
        let square = as_f64(&[
            Point2::new(0, 0),
            Point2::new(10, 0),
            Point2::new(10, 10),
            Point2::new(0, 10),
        ]);
        assert!(is_convex(&square));
        assert!(signed_area(&square) > 0.0);
    }
}
