// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Kurbo rectangles as box keys: overlap and containment queries.
//!
//! Run with `cargo run -p understory_kdtree --example kurbo_rects --features kurbo`.

use kurbo::{Point, Rect};
use understory_kdtree::adapters::kurbo::{KurboPointSet, KurboRectMap};

fn main() -> Result<(), understory_kdtree::Error> {
    let mut widgets: KurboRectMap<&str> = KurboRectMap::new();
    widgets.insert(Rect::new(0.0, 0.0, 200.0, 40.0), "toolbar");
    widgets.insert(Rect::new(0.0, 40.0, 60.0, 400.0), "sidebar");
    widgets.insert(Rect::new(60.0, 40.0, 400.0, 400.0), "canvas");
    widgets.insert(Rect::new(300.0, 300.0, 380.0, 380.0), "minimap");

    let damage = Rect::new(50.0, 30.0, 70.0, 50.0);
    let hit: Vec<_> = widgets.overlapping(&damage)?.map(|(_, v)| *v).collect();
    println!("overlapping {damage:?}: {hit:?}");

    let view = Rect::new(0.0, 0.0, 400.0, 400.0);
    let shown: Vec<_> = widgets.inside(&view)?.map(|(_, v)| *v).collect();
    println!("inside {view:?}: {shown:?}");

    let mut anchors: KurboPointSet = KurboPointSet::new();
    for i in 0..10 {
        let f = f64::from(i);
        anchors.insert_key(Point::new(f * 40.0, f * 35.0));
    }
    let cursor = Point::new(130.0, 90.0);
    if let Some(n) = anchors.euclidean_neighbors::<f64>(&cursor)?.next() {
        let n = n?;
        println!("snap {cursor:?} to {:?} ({:.1} away)", n.key, n.distance);
    }
    Ok(())
}
