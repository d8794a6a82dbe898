//-----------------------------------------------------------------------------
// Benchmark of the CAN packet codec and the receive path
// cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

use vnetlink::codec::{HardwareCanPacket, Packet};
use vnetlink::message::CanMessage;
use vnetlink::{Codec, Link, LinkConfig, Message, MessageFilter, NetId, Transport};

struct NullTransport;

impl Transport for NullTransport {
    fn write(&self, _bytes: &[u8]) -> std::io::Result<()> {
        Ok(())
    }
}

fn can_message() -> CanMessage {
    let mut m = CanMessage::new_extended(NetId::HsCan, 0x18FE_F100, &[1, 2, 3, 4, 5, 6, 7, 8]);
    m.timestamp = 0x0123_4567_89AB;
    m
}

fn bench_can_codec(c: &mut Criterion) {
    let message = can_message();
    let bytes = HardwareCanPacket::encode_from_message(&message).unwrap();
    let packet = Packet {
        network: NetId::HsCan,
        data: bytes.to_vec(),
    };

    let mut group = c.benchmark_group("can_codec");
    group.throughput(Throughput::Elements(1));
    group.bench_function("encode", |b| b.iter(|| HardwareCanPacket::encode_from_message(black_box(&message))));
    group.bench_function("decode", |b| b.iter(|| HardwareCanPacket::decode_to_message(black_box(&packet))));
    group.finish();
}

fn bench_receive(c: &mut Criterion) {
    let codec = Codec::new();
    let frame = codec.encode(&Message::Can(can_message())).unwrap();
    let stream: Vec<u8> = frame.iter().copied().cycle().take(frame.len() * 100).collect();

    let link = Link::new(Arc::new(NullTransport), LinkConfig::default().set_polling_message_limit(1000));
    link.enable_message_polling();

    let mut group = c.benchmark_group("receive");
    group.throughput(Throughput::Elements(100));
    group.bench_function("on_receive_100_can", |b| {
        b.iter(|| {
            link.on_receive(black_box(&stream));
            link.get_messages(&MessageFilter::all())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_can_codec, bench_receive);
criterion_main!(benches);
