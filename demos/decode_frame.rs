use compact_binary_protocol::{DataItem, DecodedPacket, FrameError, Generation, PacketDecoder};

fn main() -> Result<(), FrameError> {
    simplelog::TermLogger::init(
        log::LevelFilter::Trace,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .unwrap();

    // Frame from the command line, or a telemetry frame with one steps item.
    let frame = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "01540000070a012345678900000064011e0100040000019c".to_string());
    let generation = match std::env::args().nth(2).as_deref() {
        Some("legacy") => Generation::Legacy,
        _ => Generation::Current,
    };

    let packet = PacketDecoder::new(generation).decode_hex(&frame)?;
    let header = packet.header();
    println!(
        "{} from {} (transaction {}, timestamp {:?})",
        header.command,
        header.device_id,
        header.transaction_id,
        header.timestamp()
    );

    match packet {
        DecodedPacket::Telemetry(packet) => {
            for item in &packet.body.items {
                match item {
                    DataItem::Unknown(raw) => println!("  skipped {}", raw.item_type),
                    item => println!("  {item:?}"),
                }
            }
        }
        other => println!("  {other:?}"),
    }

    Ok(())
}
