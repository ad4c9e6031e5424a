use ndarray::{Array, Array2, ArrayView2, Axis};
use num_complex::Complex;
use rustfft::{FftDirection, FftPlanner};

fn fft2_direction(slice:&Array2<Complex<f32>>,direction:FftDirection) -> Array2<Complex<f32>> {
    let mut slice = slice.clone();
    let mut fft_planner = FftPlanner::<f32>::new();
    for axis in 0..2 {
        let n = slice.shape()[axis];
        let fft = fft_planner.plan_fft(n,direction);
        for mut line in slice.lanes_mut(Axis(axis)) {
            let mut temp = line.to_vec();
            fft.process(&mut temp);
            // normalize the result
            temp.iter_mut().for_each(|e| *e /= (n as f32).sqrt());
            // assign temp back to line
            line.assign(&Array::from_vec(temp));
        }
    }
    slice
}

/// unitary 2-D forward transform (no shift)
pub fn fft2(slice:&Array2<Complex<f32>>) -> Array2<Complex<f32>> {
    fft2_direction(slice,FftDirection::Forward)
}

pub fn ifft2(slice:&Array2<Complex<f32>>) -> Array2<Complex<f32>> {
    fft2_direction(slice,FftDirection::Inverse)
}

pub fn to_complex(image:ArrayView2<f32>) -> Array2<Complex<f32>> {
    image.mapv(|v| Complex::new(v,0.0))
}

/// Integer translation (row, col) that best maps `moving` onto `fixed`,
/// found at the peak of the normalized cross-power spectrum.
/// Shifts larger than half the image wrap to negative values.
pub fn phase_correlation_shift(fixed:ArrayView2<f32>,moving:ArrayView2<f32>) -> (f64,f64) {
    assert_eq!(fixed.shape(),moving.shape(),"phase correlation needs images of equal shape");
    let f = fft2(&to_complex(fixed));
    let m = fft2(&to_complex(moving));
    let mut cross = Array2::<Complex<f32>>::zeros(f.raw_dim());
    ndarray::Zip::from(&mut cross).and(&f).and(&m).for_each(|c,a,b|{
        let p = a * b.conj();
        let norm = p.norm();
        *c = match norm > f32::EPSILON {
            true => p / norm,
            false => Complex::new(0.0,0.0)
        };
    });
    let corr = ifft2(&cross);

    let mut peak = (0usize,0usize);
    let mut peak_val = f32::MIN;
    for ((r,c),v) in corr.indexed_iter() {
        if v.re > peak_val {
            peak_val = v.re;
            peak = (r,c);
        }
    }
    let (rows,cols) = corr.dim();
    let unwrap = |p:usize,n:usize| -> f64 {
        match p > n/2 {
            true => p as f64 - n as f64,
            false => p as f64
        }
    };
    (unwrap(peak.0,rows),unwrap(peak.1,cols))
}
