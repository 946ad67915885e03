//! Integration tests for sfumato-core.
//!
//! Exercises the pool, tensors, and strided views together the way a
//! sampling step does: acquire scratch, compute through views, release.

use sfumato_core::{DType, Nchw, Tensor, TensorPool, TensorView, TensorViewMut, copy_window};

#[test]
fn steady_state_step_allocates_nothing_new() {
    let mut pool = TensorPool::new();
    let dims = [1, 4, 16, 16];

    // Warm-up step: three scratch buffers alive at once.
    let a = pool.acquire(DType::F32, &dims);
    let b = pool.acquire(DType::F32, &dims);
    let c = pool.acquire(DType::F32, &dims);
    pool.release_all([a, b, c]);
    let misses_after_warmup = pool.stats().misses;

    for _ in 0..50 {
        let mut a = pool.acquire(DType::F32, &dims);
        let b = pool.acquire(DType::F32, &dims);
        let mut c = pool.acquire(DType::F32, &dims);
        a.fill(1.0);
        c.copy_from(&a).unwrap();
        c.add_scaled(&b, 2.0).unwrap();
        pool.release_all([a, b, c]);
    }

    assert_eq!(pool.stats().misses, misses_after_warmup);
    assert_eq!(pool.stats().hits, 150);
}

#[test]
fn view_writes_are_visible_in_tensor() {
    let mut t = Tensor::zeros(DType::F32, &[1, 3, 4, 4]);
    {
        let mut v = TensorViewMut::new(&mut t).unwrap();
        *v.get_mut(0, 2, 3, 1).unwrap() = 7.0;
    }
    let shape = Nchw::from_dims(t.dims()).unwrap();
    assert_eq!(t.as_slice()[shape.offset(0, 2, 3, 1)], 7.0);
}

#[test]
fn copy_window_into_padded_tile() {
    // Edge tile: a 3×2 latent region placed into a 4×4 zero-padded buffer.
    let data: Vec<f32> = (0..(4 * 6 * 6)).map(|i| i as f32).collect();
    let latent = Tensor::from_vec(DType::F32, &[1, 4, 6, 6], data).unwrap();
    let mut pool = TensorPool::new();
    let mut tile = pool.acquire(DType::F32, &[1, 4, 4, 4]);
    {
        let src = TensorView::new(&latent).unwrap();
        let mut dst = TensorViewMut::new(&mut tile).unwrap();
        copy_window(&src, (3, 4), &mut dst, (0, 0), (3, 2)).unwrap();
    }
    let v = TensorView::new(&tile).unwrap();
    let src = TensorView::new(&latent).unwrap();
    for c in 0..4 {
        for y in 0..4 {
            for x in 0..4 {
                let expected = if y < 3 && x < 2 {
                    src.get(0, c, 3 + y, 4 + x).unwrap()
                } else {
                    0.0
                };
                assert_eq!(v.get(0, c, y, x), Some(expected), "c={c} y={y} x={x}");
            }
        }
    }
}

#[test]
fn f16_tensor_survives_pool_cycle_with_dtype() {
    let mut pool = TensorPool::new();
    let t = Tensor::from_vec(DType::F16, &[2, 2], vec![0.1, 0.2, 0.3, 0.4]).unwrap();
    pool.release(t);
    let t = pool.acquire(DType::F16, &[2, 2]);
    assert_eq!(t.dtype(), DType::F16);
    assert_eq!(pool.stats().hits, 1);
}
