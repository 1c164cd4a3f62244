use super::{Color, ColorError};

// even counts average the two middle values, truncated
pub(super) fn median_color(samples: &[Color]) -> Result<Color, ColorError> {
    if samples.is_empty() {
        return Err(ColorError::SamplingExhausted);
    }
    let mut channel = Vec::with_capacity(samples.len());
    let mut out = [0u8; 3];
    for (idx, slot) in out.iter_mut().enumerate() {
        channel.clear();
        channel.extend(samples.iter().map(|color| color.channels()[idx]));
        *slot = median_u8(&mut channel);
    }
    Ok(Color::new(out[0], out[1], out[2]))
}

pub(super) fn mean_color<I>(pixels: I) -> Result<Color, ColorError>
where
    I: IntoIterator<Item = Color>,
{
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for color in pixels {
        for (sum, value) in sums.iter_mut().zip(color.channels()) {
            *sum += value as u64;
        }
        count += 1;
    }
    if count == 0 {
        return Err(ColorError::SamplingExhausted);
    }
    Ok(Color::new(
        (sums[0] / count) as u8,
        (sums[1] / count) as u8,
        (sums[2] / count) as u8,
    ))
}

fn median_u8(values: &mut [u8]) -> u8 {
    let mid = values.len() / 2;
    let odd = values.len() % 2 == 1;
    let (lower, upper, _) = values.select_nth_unstable(mid);
    let upper = *upper;
    if odd {
        return upper;
    }
    let lower = lower.iter().copied().max().unwrap_or(upper);
    ((lower as u16 + upper as u16) / 2) as u8
}
