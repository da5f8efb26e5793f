use std::{
    fs, io,
    net::{Ipv4Addr, SocketAddr, UdpSocket},
    path::Path,
};

const SERVER_IP_FILE: &str = "serverip.txt";

/// Address of the interface that routes off-host. Connecting a UDP socket
/// only selects a route; nothing is sent.
pub fn lan_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 80)).ok()?;
    match socket.local_addr().ok()? {
        SocketAddr::V4(addr) if !addr.ip().is_loopback() && !addr.ip().is_unspecified() => {
            Some(*addr.ip())
        }
        _ => None,
    }
}

/// Host other machines on the network should use, `localhost` when offline.
pub fn lan_host() -> String {
    lan_ipv4().map_or_else(|| "localhost".to_string(), |ip| ip.to_string())
}

/// Control pages on other devices read this file to find the server.
pub fn write_server_ip(public_dir: &Path, host: &str) -> io::Result<()> {
    fs::create_dir_all(public_dir)?;
    fs::write(public_dir.join(SERVER_IP_FILE), host)
}
