use image::RgbImage;
use ndarray::Array4;

/// Converts an image into a `(1, 3, height, width)` array of channel values in `[0, 1]`,
/// the layout ONNX vision models take as input.
pub fn convert_rgb_image_to_owned_array(rgb_image: &RgbImage) -> Array4<f32> {
    let mut image_array = Array4::zeros((
        1,
        3,
        rgb_image.height() as usize,
        rgb_image.width() as usize,
    ));
    for (x, y, pixel) in rgb_image.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        let [r, g, b] = pixel.0;
        image_array[[0, 0, y, x]] = f32::from(r) / 255.;
        image_array[[0, 1, y, x]] = f32::from(g) / 255.;
        image_array[[0, 2, y, x]] = f32::from(b) / 255.;
    }
    image_array
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn convert_rgb_image_to_owned_array_test() {
        let mut rgb_img = RgbImage::new(3, 2);
        rgb_img.put_pixel(0, 1, Rgb([255, 0, 0]));
        rgb_img.put_pixel(2, 1, Rgb([0, 0, 255]));
        rgb_img.put_pixel(2, 0, Rgb([255, 255, 255]));

        let arr4_img = convert_rgb_image_to_owned_array(&rgb_img);
        // Array4s for images are arrays of images. The dimensions encode
        // (image, channel, row, column).
        assert_eq!(arr4_img.shape(), &[1, 3, 2, 3]);
        assert_eq!(
            (arr4_img[[0, 0, 0, 0]], arr4_img[[0, 1, 0, 0]], arr4_img[[0, 2, 0, 0]]),
            (0.0, 0.0, 0.0)
        );
        assert_eq!(
            (arr4_img[[0, 0, 1, 0]], arr4_img[[0, 1, 1, 0]], arr4_img[[0, 2, 1, 0]]),
            (1.0, 0.0, 0.0)
        );
        assert_eq!(
            (arr4_img[[0, 0, 1, 2]], arr4_img[[0, 1, 1, 2]], arr4_img[[0, 2, 1, 2]]),
            (0.0, 0.0, 1.0)
        );
        assert_eq!(
            (arr4_img[[0, 0, 0, 2]], arr4_img[[0, 1, 0, 2]], arr4_img[[0, 2, 0, 2]]),
            (1.0, 1.0, 1.0)
        );
    }
}
