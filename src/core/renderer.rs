use crate::core::fonts::BannerFont;
use crate::domain::model::{CanvasSize, Product};
use crate::domain::ports::ImageSource;
use crate::utils::error::{BannerError, RenderError, Result};
use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

pub const TITLE_BAR_HEIGHT: u32 = 80;
pub const TITLE_FONT_SIZE: f32 = 50.0;
pub const TEXT_FONT_SIZE: f32 = 30.0;
pub const SUBTITLE: &str = "Best sellers";
const SUBTITLE_Y: i32 = 100;
const SLOTS_TOP: u32 = 150;
const SLOT_PADDING: u32 = 50;
const NAME_OFFSET: i32 = 10;
const PRICE_OFFSET: i32 = 50;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Position and size of one product slot on a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Lay out `count` product slots: each a quarter of the canvas wide and half
/// of it tall, separated by fixed padding, centred horizontally as a group.
pub fn slot_layout(size: CanvasSize, count: usize) -> Vec<Slot> {
    let width = size.width / 4;
    let height = size.height / 2;
    let count = count as u32;
    let group = (width * count + SLOT_PADDING * count.saturating_sub(1)).min(size.width);
    let x_start = (size.width - group) / 2;

    (0..count)
        .map(|i| Slot {
            x: x_start + (width + SLOT_PADDING) * i,
            y: SLOTS_TOP,
            width,
            height,
        })
        .collect()
}

/// Downloads product images with the crate's reqwest client.
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    /// `timeout` of `None` leaves image downloads unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(BannerError::HttpClientError)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch_image(&self, url: &str) -> std::result::Result<Vec<u8>, RenderError> {
        let fetch_error = |source: reqwest::Error| RenderError::ImageFetch {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(fetch_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::ImageStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(fetch_error)?;
        Ok(bytes.to_vec())
    }
}

pub struct BannerRenderer {
    images: Arc<dyn ImageSource>,
    font: BannerFont,
}

impl BannerRenderer {
    pub fn new(images: Arc<dyn ImageSource>, font: BannerFont) -> Self {
        Self { images, font }
    }

    pub fn http(image_timeout: Option<Duration>, font_path: Option<&str>) -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpImageSource::new(image_timeout)?),
            BannerFont::load(font_path),
        ))
    }

    /// Compose the banner for `domain` at `size`. Any product image that
    /// cannot be fetched or decoded fails the whole banner.
    pub async fn render(
        &self,
        domain: &str,
        products: &[Product],
        size: CanvasSize,
    ) -> std::result::Result<RgbImage, RenderError> {
        let images = self.fetch_images(products).await?;
        let font = self.font.clone();
        let domain = domain.to_string();
        let products = products.to_vec();
        tokio::task::spawn_blocking(move || compose(&font, &domain, &products, &images, size))
            .await?
    }

    /// [`render`](Self::render) followed by PNG encoding, both off the async workers.
    pub async fn render_png(
        &self,
        domain: &str,
        products: &[Product],
        size: CanvasSize,
    ) -> std::result::Result<Vec<u8>, RenderError> {
        let images = self.fetch_images(products).await?;
        let font = self.font.clone();
        let domain = domain.to_string();
        let products = products.to_vec();
        tokio::task::spawn_blocking(move || {
            compose(&font, &domain, &products, &images, size).and_then(|banner| encode_png(&banner))
        })
        .await?
    }

    async fn fetch_images(
        &self,
        products: &[Product],
    ) -> std::result::Result<Vec<Vec<u8>>, RenderError> {
        let mut images = Vec::with_capacity(products.len());
        for product in products {
            images.push(self.images.fetch_image(&product.image_url).await?);
        }
        Ok(images)
    }
}

fn compose(
    font: &BannerFont,
    domain: &str,
    products: &[Product],
    images: &[Vec<u8>],
    size: CanvasSize,
) -> std::result::Result<RgbImage, RenderError> {
    let mut canvas = RgbImage::from_pixel(size.width, size.height, WHITE);
    let center_x = (size.width / 2) as i32;

    for y in 0..TITLE_BAR_HEIGHT.min(size.height) {
        for x in 0..size.width {
            canvas.put_pixel(x, y, BLACK);
        }
    }
    font.draw_centered(
        &mut canvas,
        domain,
        center_x,
        (TITLE_BAR_HEIGHT / 2) as i32,
        TITLE_FONT_SIZE,
        WHITE,
    );
    font.draw_centered(&mut canvas, SUBTITLE, center_x, SUBTITLE_Y, TITLE_FONT_SIZE, BLACK);

    let slots = slot_layout(size, products.len());
    for ((product, bytes), slot) in products.iter().zip(images).zip(slots) {
        let picture = image::load_from_memory(bytes)
            .map_err(|source| RenderError::ImageDecode {
                url: product.image_url.clone(),
                source,
            })?
            .to_rgb8();
        let picture = imageops::resize(&picture, slot.width, slot.height, FilterType::Triangle);
        imageops::overlay(&mut canvas, &picture, slot.x as i64, slot.y as i64);

        let text_x = (slot.x + slot.width / 2) as i32;
        let slot_bottom = (slot.y + slot.height) as i32;
        font.draw_centered(
            &mut canvas,
            &product.name,
            text_x,
            slot_bottom + NAME_OFFSET,
            TEXT_FONT_SIZE,
            BLACK,
        );
        font.draw_centered(
            &mut canvas,
            &product.price,
            text_x,
            slot_bottom + PRICE_OFFSET,
            TEXT_FONT_SIZE,
            BLACK,
        );
    }

    Ok(canvas)
}

pub fn encode_png(banner: &RgbImage) -> std::result::Result<Vec<u8>, RenderError> {
    let mut buffer = Cursor::new(Vec::new());
    banner
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(RenderError::Encode)?;
    Ok(buffer.into_inner())
}
