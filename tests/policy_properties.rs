use proptest::prelude::*;
use responsive_images::policy::{FileSizePolicy, SizesPolicy, WidthPolicy};
use responsive_images::{PolicyParameters, SizingPolicy, SourceMetrics};

fn metrics_strategy() -> impl Strategy<Value = SourceMetrics> {
    (1..5000u32, 1..5000u32, 0..5_000_000u64).prop_map(|(width, height, byte_size)| SourceMetrics {
        width,
        height,
        byte_size,
    })
}

fn parameters_strategy() -> impl Strategy<Value = PolicyParameters> {
    (
        0..1000u32,
        proptest::option::of(0..4000u32),
        0..20_000u64,
        proptest::option::of(1..2_000_000u64),
        0.05..1.5f64,
        any::<bool>(),
    )
        .prop_map(
            |(min_width, max_extra, min_file_size, max_file_size, step_modifier, include_source)| {
                PolicyParameters {
                    min_width,
                    max_width: max_extra.map(|extra| min_width + extra),
                    min_file_size,
                    max_file_size,
                    step_modifier,
                    include_source,
                }
            },
        )
}

fn all_policies(parameters: PolicyParameters, sizes: Vec<u32>) -> Vec<Box<dyn SizingPolicy>> {
    vec![
        Box::new(WidthPolicy::new(parameters)),
        Box::new(FileSizePolicy::new(parameters)),
        Box::new(SizesPolicy::new(parameters, sizes)),
    ]
}

proptest! {
    #[test]
    fn prop_scaling_is_deterministic(
        metrics in metrics_strategy(),
        parameters in parameters_strategy(),
        sizes in proptest::collection::vec(1..6000u32, 0..8)
    ) {
        for policy in all_policies(parameters, sizes.clone()) {
            prop_assert_eq!(policy.scale(&metrics), policy.scale(&metrics));
        }
    }

    #[test]
    fn prop_never_upscales_and_heights_are_positive(
        metrics in metrics_strategy(),
        parameters in parameters_strategy(),
        sizes in proptest::collection::vec(1..6000u32, 0..8)
    ) {
        for policy in all_policies(parameters, sizes.clone()) {
            for target in &policy.scale(&metrics) {
                prop_assert!(target.width <= metrics.width, "{:?} upscaled to {}", policy.kind(), target.width);
                prop_assert!(target.height >= 1);
            }
        }
    }

    #[test]
    fn prop_generated_widths_respect_bounds(
        metrics in metrics_strategy(),
        parameters in parameters_strategy()
    ) {
        let policies: Vec<Box<dyn SizingPolicy>> = vec![
            Box::new(WidthPolicy::new(parameters)),
            Box::new(FileSizePolicy::new(parameters)),
        ];

        for policy in policies {
            let sizes = policy.scale(&metrics);
            for target in &sizes {
                if let Some(max_width) = parameters.max_width {
                    prop_assert!(target.width <= max_width);
                }
                if target.width != metrics.width {
                    prop_assert!(target.width >= parameters.min_width);
                }
            }
            if !parameters.include_source {
                prop_assert!(sizes.iter().all(|target| target.width < metrics.width));
            }
        }
    }

    #[test]
    fn prop_explicit_sizes_only_emit_requested_or_native(
        metrics in metrics_strategy(),
        parameters in parameters_strategy(),
        sizes in proptest::collection::vec(1..6000u32, 0..8)
    ) {
        let policy = SizesPolicy::new(parameters, sizes.clone());

        for target in &policy.scale(&metrics) {
            let native = parameters.include_source && target.width == metrics.width;
            prop_assert!(native || sizes.contains(&target.width));
        }
    }
}

#[test]
fn width_policy_terminates_with_expected_candidates() {
    let policy = WidthPolicy::new(PolicyParameters {
        min_width: 300,
        max_width: None,
        min_file_size: 5000,
        max_file_size: None,
        step_modifier: 0.8,
        include_source: false,
    });

    let sizes = policy.scale(&SourceMetrics {
        width: 1920,
        height: 1280,
        byte_size: 500_000,
    });

    assert_eq!(sizes.widths(), vec![1536, 1228, 982, 785, 628, 502, 401, 320]);
}
