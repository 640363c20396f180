use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use rill::{
    BufferPool, Config, Exchange, Handler,
    h1::BoxError,
    headers::standard::CONTENT_LENGTH,
    rt::{serve, shutdown_channel},
};

/// Echo the request body, or the request line when the body is empty.
struct Echo;

impl<R, W> Handler<R, W> for Echo
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn call(&self, ex: &mut Exchange<'_, R, W>) -> Result<(), BoxError> {
        log::info!("{} {}{}", ex.method(), ex.path(), ex.query());

        let mut body = Vec::new();
        ex.read_to_end(&mut body).await?;
        if body.is_empty() {
            body = format!("{} {}{}\n", ex.method(), ex.path(), ex.query()).into_bytes();
        }

        ex.headers_mut()?.insert(CONTENT_LENGTH, body.len().to_string());
        ex.headers_mut()?.insert("Content-Type", "text/plain");
        ex.write(&body).await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config = Arc::new(Config::default().with_server_header("rill"));
    let pool = BufferPool::new(&config);
    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    let (trigger, shutdown) = shutdown_channel();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.trigger();
        }
    });

    serve(listener, pool, config, Arc::new(Echo), shutdown).await;
    Ok(())
}
