//! Property tests for popover placement and the spotlight overlay.

use proptest::prelude::*;
use tourguide::{
    ElementHandle, OverlayHit, PlacementSide, PlacementSolver, Point, Rect, Side, Spotlight,
    StepRegistry, TourStep, Viewport,
};

const W: i32 = 320;
const H: i32 = 300;
const M: i32 = 16;

fn viewport() -> impl Strategy<Value = Viewport> {
    (W + 2 * M..2400, H + 2 * M..1600, 0..5000i32)
        .prop_map(|(w, h, sy)| Viewport::new(w, h).with_scroll(0, sy))
}

fn cramped_viewport() -> impl Strategy<Value = Viewport> {
    (1..W + 2 * M, 1..H + 2 * M).prop_map(|(w, h)| Viewport::new(w, h))
}

fn target_in(viewport: Viewport) -> impl Strategy<Value = Rect> {
    (0..viewport.width, 0..viewport.height).prop_flat_map(move |(x, y)| {
        (1..=viewport.width - x, 1..=viewport.height - y)
            .prop_map(move |(w, h)| Rect::new(x, y, w, h))
    })
}

fn side() -> impl Strategy<Value = Side> {
    prop_oneof![
        Just(Side::Top),
        Just(Side::Bottom),
        Just(Side::Left),
        Just(Side::Right)
    ]
}

proptest! {
    #[test]
    fn placement_stays_inside_viewport(
        (vp, target) in viewport().prop_flat_map(|vp| (Just(vp), target_in(vp))),
        preferred in side(),
    ) {
        let placement = PlacementSolver::default().solve(target, vp, preferred);
        prop_assert!(vp.bounds().contains_rect(&placement.rect), "{placement:?} escapes {vp:?}");
        prop_assert_eq!(placement.rect.width, W);
        prop_assert_eq!(placement.rect.height, H);
        prop_assert_eq!(placement.page_rect, vp.to_page(placement.rect));
    }

    #[test]
    fn cramped_viewport_keeps_origin_on_screen(
        (vp, target) in cramped_viewport().prop_flat_map(|vp| (Just(vp), target_in(vp))),
        preferred in side(),
    ) {
        let placement = PlacementSolver::default().solve(target, vp, preferred);
        prop_assert!(placement.rect.x >= 0, "{placement:?} in {vp:?}");
        prop_assert!(placement.rect.y >= 0, "{placement:?} in {vp:?}");
        if placement.side == PlacementSide::Center {
            prop_assert_eq!(placement.rect.x, ((vp.width - W) / 2).max(0));
            prop_assert_eq!(placement.rect.y, ((vp.height - H) / 2).max(0));
        }
    }

    #[test]
    fn sided_placement_never_covers_target(
        (vp, target) in viewport().prop_flat_map(|vp| (Just(vp), target_in(vp))),
    ) {
        let placement = PlacementSolver::default().solve(target, vp, Side::Bottom);
        if placement.side != PlacementSide::Center {
            prop_assert!(placement.rect.intersection_opt(&target).is_none());
        }
    }

    #[test]
    fn placement_follows_fixed_priority(
        (vp, target) in viewport().prop_flat_map(|vp| (Just(vp), target_in(vp))),
    ) {
        let placement = PlacementSolver::default().solve(target, vp, Side::Left);
        let below = vp.height - target.bottom() >= H + M;
        let above = target.top() >= H + M;
        let right = vp.width - target.right() >= W + M;
        let left = target.left() >= W + M;
        let expected = if below {
            PlacementSide::Bottom
        } else if above {
            PlacementSide::Top
        } else if right {
            PlacementSide::Right
        } else if left {
            PlacementSide::Left
        } else {
            PlacementSide::Center
        };
        prop_assert_eq!(placement.side, expected);
    }

    #[test]
    fn scrim_and_cutout_partition_viewport(
        (vp, target) in viewport().prop_flat_map(|vp| (Just(vp), target_in(vp))),
        padding in 0..32i32,
    ) {
        let spotlight = Spotlight::new(vp).padding(padding).target(target);
        let cut = spotlight.cutout().expect("target inside viewport");
        let bands = spotlight.scrim();
        let covered: i64 = bands.iter().map(Rect::area).sum();
        prop_assert_eq!(covered + cut.area(), vp.bounds().area());
        for (i, a) in bands.iter().enumerate() {
            prop_assert!(a.intersection_opt(&cut).is_none());
            for b in &bands[i + 1..] {
                prop_assert!(a.intersection_opt(b).is_none());
            }
        }
    }

    #[test]
    fn hit_test_agrees_with_scrim(
        (vp, target) in viewport().prop_flat_map(|vp| (Just(vp), target_in(vp))),
        px in 0..2400i32,
        py in 0..1600i32,
    ) {
        let spotlight = Spotlight::new(vp).target(target);
        let point = Point::new(px, py);
        let in_scrim = spotlight.scrim().iter().any(|band| band.contains(point));
        match spotlight.hit_test(point) {
            OverlayHit::Scrim => prop_assert!(in_scrim),
            OverlayHit::Cutout => prop_assert!(!in_scrim),
            OverlayHit::Outside => prop_assert!(!vp.bounds().contains(point)),
            OverlayHit::Popover => prop_assert!(false, "no popover configured"),
        }
    }

    #[test]
    fn registry_sorted_is_ordered_and_stable(orders in prop::collection::vec(-50i64..50, 0..40)) {
        let mut registry = StepRegistry::new();
        for (i, order) in orders.iter().enumerate() {
            registry
                .attach(TourStep::new(format!("s{i}"), *order), ElementHandle(i as u64))
                .unwrap();
        }
        let sorted = registry.sorted();
        prop_assert_eq!(sorted.len(), orders.len());
        for pair in sorted.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.step.order <= b.step.order);
            if a.step.order == b.step.order {
                // Equal keys keep attach order; element handles were assigned in attach order.
                prop_assert!(a.element < b.element);
            }
        }
    }
}
