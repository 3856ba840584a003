use param_layout::{
    bias_keys, gradients_from_flattened, init, is_bias_param, is_weight_param, num_params,
    param_keys, Constant, LayerKind, LayerSpec, LayoutError,
};

/// Every layer family at a few boundary configurations. The sweep is the
/// proof that the planner and the counter never disagree: a disagreement
/// would surface as a `ShapeMismatch` from any of the calls below.
fn sweep() -> Vec<LayerSpec> {
    let mut specs = Vec::new();

    for has_bias in [false, true] {
        for (n_in, n_out) in [(1, 1), (3, 2), (16, 4)] {
            specs.push(LayerSpec::new(LayerKind::Dense {
                n_in,
                n_out,
                has_bias,
            }));
        }

        for kernel in [[1, 1], [3, 3], [5, 1]] {
            for stride in [[1, 1], [2, 2]] {
                specs.push(LayerSpec::new(LayerKind::Convolution2D {
                    n_in: 3,
                    n_out: 8,
                    kernel,
                    stride,
                    has_bias,
                }));
            }
        }

        specs.push(LayerSpec::new(LayerKind::Convolution1D {
            n_in: 4,
            n_out: 6,
            kernel: 3,
            stride: 2,
            has_bias,
        }));

        for depth_multiplier in [1, 2, 3] {
            specs.push(LayerSpec::new(LayerKind::DepthwiseConvolution2D {
                n_in: 3,
                depth_multiplier,
                kernel: [3, 3],
                stride: [1, 1],
                has_bias,
            }));
            specs.push(LayerSpec::new(LayerKind::SeparableConvolution2D {
                n_in: 3,
                n_out: 8,
                depth_multiplier,
                kernel: [3, 3],
                stride: [2, 2],
                has_bias,
            }));
        }
    }

    for use_log_std in [false, true] {
        for trainable_gamma_beta in [false, true] {
            specs.push(LayerSpec::new(LayerKind::BatchNorm {
                n_out: 4,
                use_log_std,
                trainable_gamma_beta,
            }));
        }
    }

    for (n_in, n_out) in [(1, 1), (5, 7), (13, 13)] {
        specs.push(LayerSpec::new(LayerKind::Lstm { n_in, n_out }));
    }

    for use_bias in [false, true] {
        for layer_norm in [false, true] {
            specs.push(LayerSpec::new(LayerKind::SimpleRnn {
                n_in: 5,
                n_out: 7,
                use_bias,
                layer_norm,
            }));
        }
    }

    specs
}

fn logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn counter_and_planner_agree_across_the_sweep() {
    logging();

    for spec in sweep() {
        let total = num_params(&spec).unwrap();
        let mut buffer = vec![0.0f32; total];

        // `init` plans internally and refuses a count disagreement, so
        // succeeding here proves agreement for this spec.
        let views = init(&spec, &mut buffer, false, &Constant(0.0)).unwrap();

        let viewed: usize = views.iter().map(|(_, v)| v.len()).sum();
        assert_eq!(viewed, total, "family {}", spec.family());
    }
}

#[test]
fn views_cover_the_buffer_disjointly_and_in_order() {
    for spec in sweep() {
        let total = num_params(&spec).unwrap();

        // A counting buffer: if the views are disjoint, ordered and
        // complete, walking them back in view order reproduces it.
        let mut buffer: Vec<f32> = (0..total).map(|i| i as f32).collect();
        let views = init(&spec, &mut buffer, false, &Constant(0.0)).unwrap();

        let walked: Vec<f32> = views
            .iter()
            .flat_map(|(_, view)| view.iter().copied().collect::<Vec<_>>())
            .collect();
        let expected: Vec<f32> = (0..total).map(|i| i as f32).collect();

        assert_eq!(walked, expected, "family {}", spec.family());
    }
}

#[test]
fn loading_does_not_touch_the_buffer() {
    for spec in sweep() {
        let total = num_params(&spec).unwrap();
        let mut buffer = vec![0.125f32; total];

        init(&spec, &mut buffer, false, &Constant(9.0)).unwrap();

        assert!(
            buffer.iter().all(|&x| x == 0.125),
            "family {}",
            spec.family()
        );
    }
}

#[test]
fn gradient_views_mirror_parameter_views() {
    for spec in sweep() {
        let total = num_params(&spec).unwrap();
        let mut params = vec![0.0f32; total];
        let mut grad = vec![0.0f32; total];

        let param_views = init(&spec, &mut params, true, &Constant(0.5)).unwrap();
        let grad_views = gradients_from_flattened(&spec, &mut grad).unwrap();

        assert_eq!(
            param_views.keys().collect::<Vec<_>>(),
            grad_views.keys().collect::<Vec<_>>(),
            "family {}",
            spec.family()
        );

        for (key, view) in param_views.iter() {
            assert_eq!(
                view.shape(),
                grad_views.get(key).unwrap().shape(),
                "family {} key {key}",
                spec.family()
            );
        }
    }
}

#[test]
fn views_alias_the_buffer_without_copies() {
    logging();

    for spec in sweep() {
        let total = num_params(&spec).unwrap();
        let mut buffer = vec![0.0f32; total];

        let mut offsets = Vec::new();
        {
            let mut views = init(&spec, &mut buffer, false, &Constant(0.0)).unwrap();

            // Write a distinct sentinel through every view and remember
            // where its interval must start.
            let mut offset = 0;
            let keys: Vec<_> = views.keys().collect();
            for (i, &key) in keys.iter().enumerate() {
                let view = views.get_mut(key).unwrap();
                let sentinel = (i + 1) as f32;
                view.fill(sentinel);
                offsets.push((offset, view.len(), sentinel));
                offset += view.len();
            }
        }

        // Read back through the raw buffer: no hidden copy may swallow
        // the writes.
        for (offset, len, sentinel) in offsets {
            assert!(
                buffer[offset..offset + len].iter().all(|&x| x == sentinel),
                "family {}",
                spec.family()
            );
        }
    }
}

#[test]
fn dense_three_by_two_carves_like_the_documented_example() {
    let spec = LayerSpec::new(LayerKind::Dense {
        n_in: 3,
        n_out: 2,
        has_bias: true,
    });

    assert_eq!(num_params(&spec).unwrap(), 8);

    let mut buffer = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    let views = init(&spec, &mut buffer, false, &Constant(0.0)).unwrap();

    let w = views.get("W").unwrap();
    assert_eq!(w.shape(), &[3, 2]);
    assert_eq!(w[[0, 0]], 1.0);
    assert_eq!(w[[0, 1]], 2.0);
    assert_eq!(w[[2, 1]], 6.0);

    let b = views.get("b").unwrap();
    assert_eq!(b.iter().copied().collect::<Vec<_>>(), [7.0, 8.0]);
}

#[test]
fn batch_norm_four_wide_initializes_both_statistics_to_zero() {
    let spec = LayerSpec::new(LayerKind::BatchNorm {
        n_out: 4,
        use_log_std: true,
        trainable_gamma_beta: false,
    });

    assert_eq!(num_params(&spec).unwrap(), 8);

    let mut buffer = [3.0f32; 8];
    let views = init(&spec, &mut buffer, true, &Constant(0.0)).unwrap();

    assert_eq!(views.keys().collect::<Vec<_>>(), ["mean", "log10stdev"]);
    assert_eq!(views.get("mean").unwrap().shape(), &[4]);
    assert_eq!(views.get("log10stdev").unwrap().shape(), &[4]);
    assert_eq!(buffer, [0.0; 8]);
}

#[test]
fn lstm_forget_gate_bias_overrides_the_plain_bias() {
    let n_out = 4;
    let spec = LayerSpec::new(LayerKind::Lstm { n_in: 3, n_out })
        .with_forget_gate_bias_init(5.0);

    let total = num_params(&spec).unwrap();
    let mut buffer = vec![0.0f32; total];

    let views = init(&spec, &mut buffer, true, &Constant(0.0)).unwrap();
    let b: Vec<f32> = views.get("b").unwrap().iter().copied().collect();

    assert_eq!(b.len(), 4 * n_out);
    assert!(b[..n_out].iter().all(|&x| x == 0.0));
    assert!(b[n_out..2 * n_out].iter().all(|&x| x == 5.0));
    assert!(b[2 * n_out..].iter().all(|&x| x == 0.0));
}

#[test]
fn convolution_without_bias_omits_the_key_and_the_elements() {
    let spec = LayerSpec::new(LayerKind::Convolution2D {
        n_in: 3,
        n_out: 8,
        kernel: [5, 5],
        stride: [1, 1],
        has_bias: false,
    });

    assert_eq!(num_params(&spec).unwrap(), 3 * 8 * 5 * 5);
    assert_eq!(param_keys(&spec).unwrap(), ["W"]);
    assert!(bias_keys(&spec).unwrap().is_empty());
    assert!(!is_bias_param(&spec, "b").unwrap());
    assert!(is_weight_param(&spec, "W").unwrap());
}

#[test]
fn key_introspection_matches_the_carved_views() {
    for spec in sweep() {
        let total = num_params(&spec).unwrap();
        let mut buffer = vec![0.0f32; total];
        let views = init(&spec, &mut buffer, false, &Constant(0.0)).unwrap();

        let mut listed = param_keys(&spec).unwrap();
        let mut carved: Vec<_> = views.keys().collect();
        listed.sort_unstable();
        carved.sort_unstable();

        assert_eq!(listed, carved, "family {}", spec.family());

        let weights = param_layout::weight_keys(&spec).unwrap();
        let biases = bias_keys(&spec).unwrap();

        for key in param_keys(&spec).unwrap() {
            let is_weight = is_weight_param(&spec, key).unwrap();
            let is_bias = is_bias_param(&spec, key).unwrap();

            assert!(!(is_weight && is_bias), "family {} key {key}", spec.family());
            assert_eq!(is_weight, weights.contains(&key), "family {}", spec.family());
            assert_eq!(is_bias, biases.contains(&key), "family {}", spec.family());
        }
    }
}

#[test]
fn short_buffers_are_refused_before_any_view_exists() {
    let spec = LayerSpec::new(LayerKind::Lstm { n_in: 3, n_out: 4 });
    let total = num_params(&spec).unwrap();
    let mut buffer = vec![0.0f32; total - 1];

    let err = init(&spec, &mut buffer, true, &Constant(0.0)).unwrap_err();
    assert!(matches!(err, LayoutError::BufferTooSmall { .. }));

    let err = gradients_from_flattened(&spec, &mut buffer).unwrap_err();
    assert!(matches!(err, LayoutError::BufferTooSmall { .. }));
}

#[test]
fn malformed_specs_fail_at_construction_time() {
    let spec = LayerSpec::new(LayerKind::Convolution2D {
        n_in: 3,
        n_out: 8,
        kernel: [0, 5],
        stride: [1, 1],
        has_bias: true,
    });

    assert!(matches!(
        num_params(&spec),
        Err(LayoutError::InvalidConfiguration { .. })
    ));

    let mut buffer = [0.0f32; 16];
    assert!(matches!(
        init(&spec, &mut buffer, true, &Constant(0.0)),
        Err(LayoutError::InvalidConfiguration { .. })
    ));
}
